//! Book metadata supplied by the caller.

/// Book metadata (Dublin Core subset plus the language pair).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    /// BCP 47 code of the source-language document.
    pub primary_language: String,
    /// BCP 47 code of the translation, if any.
    pub secondary_language: Option<String>,
    /// Package identifier. Derived from the other fields when empty.
    pub identifier: String,
    pub description: Option<String>,
    /// `dcterms:modified` timestamp (`CCYY-MM-DDThh:mm:ssZ`).
    pub modified: Option<String>,
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.primary_language = language.into();
        self
    }

    pub fn with_secondary_language(mut self, language: impl Into<String>) -> Self {
        self.secondary_language = Some(language.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_modified(mut self, modified: impl Into<String>) -> Self {
        self.modified = Some(modified.into());
        self
    }

    /// Primary language code, falling back to `en`.
    pub fn primary_lang(&self) -> &str {
        if self.primary_language.is_empty() {
            "en"
        } else {
            &self.primary_language
        }
    }

    /// Secondary language code, falling back to `und` (undetermined).
    pub fn secondary_lang(&self) -> &str {
        match self.secondary_language.as_deref() {
            Some(lang) if !lang.is_empty() => lang,
            _ => "und",
        }
    }
}
