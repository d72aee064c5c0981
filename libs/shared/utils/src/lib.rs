pub mod extractor;
pub mod jwt;
pub mod notify;
pub mod test_utils;
