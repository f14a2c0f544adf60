use tantivy::schema::{
    FAST, Field, INDEXED, IndexRecordOption, STORED, STRING, Schema, TEXT, TextFieldIndexing,
    TextOptions,
};

use super::tokenizer::JAPANESE_TOKENIZER_NAME;

/// Page index schema definition
#[derive(Clone, Debug)]
pub struct PageSchema {
    pub schema: Schema,
    pub id: Field,
    pub title: Field,
    pub url: Field,
    pub description: Field,
    pub text: Field,
    pub text_ja: Field,
    pub language: Field,
    pub site_id: Field,
    pub login_required: Field,
    pub pub_date: Field,
}

impl PageSchema {
    /// Create a new page schema
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        // Document key, exact match only
        let id = builder.add_text_field("id", STRING | STORED);

        // Shown in results and searched
        let title = builder.add_text_field("title", TEXT | STORED);
        let url = builder.add_text_field("url", TEXT | STORED);
        let description = builder.add_text_field("description", TEXT | STORED);

        // Indexed but not stored to save space
        let text = builder.add_text_field("text", TEXT);

        // Same text segmented for Japanese; only filled for `ja` documents
        let ja_indexing = TextFieldIndexing::default()
            .set_tokenizer(JAPANESE_TOKENIZER_NAME)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_ja =
            builder.add_text_field("text_ja", TextOptions::default().set_indexing_options(ja_indexing));

        // Filters
        let language = builder.add_text_field("language", STRING | STORED | FAST);
        let site_id = builder.add_u64_field("site_id", INDEXED | STORED | FAST);
        let login_required = builder.add_bool_field("login_required", INDEXED | STORED | FAST);

        // Publication date as a unix timestamp
        let pub_date = builder.add_i64_field("pub_date", STORED | FAST);

        let schema = builder.build();

        // Return schema with field handles

        Self {
            schema,
            id,
            title,
            url,
            description,
            text,
            text_ja,
            language,
            site_id,
            login_required,
            pub_date,
        }
    }

    /// Fields searched for a query in `language`
    pub fn text_fields(&self, language: &str) -> Vec<Field> {
        let mut fields = vec![self.title, self.description, self.text];
        if super::tokenizer::uses_japanese_segmentation(language) {
            fields.push(self.text_ja);
        }
        fields
    }
}

impl Default for PageSchema {
    fn default() -> Self {
        Self::new()
    }
}
