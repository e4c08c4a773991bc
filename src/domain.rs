pub(crate) mod eligibility;
pub(crate) mod scoring;
pub(crate) mod security;
