//! Default names for new items.

use crate::path::SEPARATOR;

/// `stem-n` with an optional `.ext`.
pub fn numbered_name(stem: &str, n: u64, ext: Option<&str>) -> String {
    match ext {
        Some(ext) if !ext.is_empty() => format!("{}-{}.{}", stem, n, ext),
        _ => format!("{}-{}", stem, n),
    }
}

/// Lowest-numbered `stem-n[.ext]` accepted by `is_valid`, counting from 1.
pub fn untitled_name(stem: &str, ext: Option<&str>, is_valid: impl Fn(&str) -> bool) -> String {
    let mut n = 1;
    loop {
        let name = numbered_name(stem, n, ext);
        if is_valid(&name) {
            return name;
        }
        n += 1;
    }
}

/// A name is usable when it is non-empty, a single segment, and not taken
/// by a sibling.
pub fn name_available<S: AsRef<str>>(siblings: &[S], name: &str) -> bool {
    !name.is_empty()
        && !name.contains(SEPARATOR)
        && !siblings.iter().any(|sibling| sibling.as_ref() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_rejected_names() {
        let taken = ["untitled-1", "untitled-2"];
        let name = untitled_name("untitled", None, |name| !taken.contains(&name));
        assert_eq!(name, "untitled-3");
    }

    #[test]
    fn test_extension_is_appended() {
        let name = untitled_name("untitled", Some("xqm"), |_| true);
        assert_eq!(name, "untitled-1.xqm");
    }

    #[test]
    fn test_lowest_gap_is_used() {
        let siblings = ["untitled-2", "untitled-3"];
        let name = untitled_name("untitled", None, |name| name_available(&siblings, name));
        assert_eq!(name, "untitled-1");
    }

    #[test]
    fn test_name_available() {
        let siblings = ["a.xml"];
        assert!(name_available(&siblings, "b.xml"));
        assert!(!name_available(&siblings, "a.xml"));
        assert!(!name_available(&siblings, ""));
        assert!(!name_available(&siblings, "x/y"));
    }
}
