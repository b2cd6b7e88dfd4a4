/// Trim whitespace (spaces, tabs, `\r`, non-breaking spaces, ...).
pub fn clean_str(raw: &str) -> String {
    raw.trim().to_string()
}

/// Strip, sort and re-join a list of names serialized as `"RIAR,AVAL,ADAL"`.
/// Ordering is byte order, so the result does not depend on locale.
pub fn sort_name_list(raw: &str) -> String {
    let mut names: Vec<&str> = raw.trim().split(',').map(str::trim).collect();
    names.sort_unstable();
    names.join(",")
}

/// Parse an integer cell, tolerating surrounding whitespace.
pub fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_str() {
        assert_eq!(clean_str("  ADAL\t\r"), "ADAL");
        assert_eq!(clean_str(""), "");
    }

    #[test]
    fn test_sort_name_list() {
        assert_eq!(sort_name_list(" RIAR, AVAL,ADAL "), "ADAL,AVAL,RIAR");
        assert_eq!(sort_name_list("AVAL"), "AVAL");
        // byte order: upper case sorts before lower case
        assert_eq!(sort_name_list("b,A,a,B"), "A,B,a,b");
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(" 007 "), Some(7));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("3.5"), None);
        assert_eq!(parse_int(""), None);
    }
}
