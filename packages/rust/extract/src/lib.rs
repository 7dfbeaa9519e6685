//! Signal extraction from page markup.
//!
//! This crate provides:
//! - [`Page`]: a parsed document with every extractor available on it
//! - free functions ([`extract_contact`], [`extract_about`], [`extract_signals`],
//!   [`extract_company_name`], [`plain_text`]) for one-off use on raw markup
//! - [`validate`]: pluggable checks for placeholder pages and generic names
//!
//! All extractors are pure and never fail; missing data yields empty values.
//! `scraper::Html` is not `Send`, so a [`Page`] must not be held across an `.await`.

mod about;
mod company;
mod contact;
mod signals;
mod text;
pub mod validate;

use scraper::Html;
use sitesignal_shared::{AboutInfo, ContactInfo, Signals};
use tracing::debug;

pub use signals::keywords;
pub use text::collapse_whitespace;
pub use validate::{
    ContentValidator, GenericCompanyNameValidator, PlaceholderContentValidator, ValidatorSet,
    Verdict,
};

/// A parsed page. Visible text is computed once at parse time.
pub struct Page {
    doc: Html,
    text: String,
}

impl Page {
    pub fn parse(markup: &str) -> Self {
        let doc = Html::parse_document(markup);
        let text = text::document_text(&doc);
        Self { doc, text }
    }

    /// Visible body text, whitespace-collapsed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn company_name(&self) -> String {
        company::company_name_of(&self.doc)
    }

    pub fn contact(&self) -> ContactInfo {
        let contact = contact::contact_of_text(&self.text);
        debug!(
            emails = contact.emails.len(),
            phones = contact.phones.len(),
            addresses = contact.addresses.len(),
            "contact details extracted"
        );
        contact
    }

    pub fn about(&self) -> AboutInfo {
        about::about_of(&self.doc)
    }

    pub fn signals(&self) -> Signals {
        let signals = signals::signals_of_text(&self.text);
        debug!(total = signals.total(), chars = self.text.len(), "signals extracted");
        signals
    }
}

/// Visible body text without scripts, styles, or templates.
pub fn plain_text(markup: &str) -> String {
    Page::parse(markup).text
}

/// Emails, phones, and street addresses found in the page text.
pub fn extract_contact(markup: &str) -> ContactInfo {
    Page::parse(markup).contact()
}

/// Title, main heading, and description.
pub fn extract_about(markup: &str) -> AboutInfo {
    Page::parse(markup).about()
}

/// Five signal buckets, one evidence entry per keyword present.
pub fn extract_signals(markup: &str) -> Signals {
    Page::parse(markup).signals()
}

/// Best-guess company name, or `"Unknown Company"`.
pub fn extract_company_name(markup: &str) -> String {
    Page::parse(markup).company_name()
}
