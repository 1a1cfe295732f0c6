/// A payload that can be delivered to a target process.
///
/// Candidates are text (the mutators insert ASCII code points and HTML
/// fragments), but the harness only ever needs the raw bytes.
pub trait Input: Clone + Send + Sync + std::fmt::Debug + 'static {
    fn as_bytes(&self) -> &[u8];
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
}

impl Input for String {
    fn as_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }
    fn len(&self) -> usize {
        self.as_str().len()
    }
    fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn string_impl_input() {
        let data = "<a>".to_string();
        let empty_data = String::new();
        assert_eq!(Input::as_bytes(&data), b"<a>");
        assert_eq!(Input::len(&data), 3);
        assert!(!Input::is_empty(&data));
        assert!(Input::is_empty(&empty_data));
    }
}
