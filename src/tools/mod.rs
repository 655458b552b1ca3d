mod citations;
mod fact_check;

pub use citations::BibliographyFormatter;
pub use fact_check::TermOverlapVerifier;
