use crate::parsers::email::extract_emails;

#[cfg(test)]
mod basic_tests {
    use super::*;

    fn emails(text: &str) -> Vec<String> {
        extract_emails(text).into_vec()
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_emails("").is_empty());
    }

    #[test]
    fn test_no_addresses() {
        assert!(extract_emails("nothing to see @ here. really").is_empty());
    }

    #[test]
    fn test_case_sensitive_distinctness() {
        assert_eq!(
            emails("contact a@b.com or A@B.COM today"),
            vec!["a@b.com", "A@B.COM"]
        );
    }

    #[test]
    fn test_duplicates_collapse_to_first_occurrence() {
        assert_eq!(
            emails("x@y.org, z@w.net, x@y.org, z@w.net, q@r.io"),
            vec!["x@y.org", "z@w.net", "q@r.io"]
        );
    }

    #[test]
    fn test_local_part_character_set() {
        assert_eq!(
            emails("mail first.last+tag_1%x-y@sub-domain.example.co.uk now"),
            vec!["first.last+tag_1%x-y@sub-domain.example.co.uk"]
        );
    }

    #[test]
    fn test_addresses_inside_markup() {
        let html = r#"<a href="mailto:sales@acme.test?subject=hi">sales@acme.test</a><p>info@acme.test</p>"#;
        assert_eq!(emails(html), vec!["sales@acme.test", "info@acme.test"]);
    }

    #[test]
    fn test_not_anchored_to_word_boundaries() {
        // surrounding characters outside the classes simply end the match
        assert_eq!(emails("(me@you.de)"), vec!["me@you.de"]);
        assert_eq!(emails("名字:boss@corp.cn。"), vec!["boss@corp.cn"]);
    }

    #[test]
    fn test_single_letter_tld_is_rejected() {
        assert!(extract_emails("user@host.c").is_empty());
    }

    #[test]
    fn test_shape_only_no_validation() {
        // image names with an @ still have the right shape
        assert_eq!(emails("logo@2x.png"), vec!["logo@2x.png"]);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use std::collections::HashSet;

    const SAMPLES: &[&str] = &[
        "",
        "a@b.com a@b.com",
        "contact a@b.com or A@B.COM today",
        "x@y.org\nq@r.io\tx@y.org;;;A@b.cc",
        "<li>foo@bar.baz</li><li>foo@bar.baz</li>",
    ];

    #[test]
    fn test_no_duplicates() {
        for text in SAMPLES {
            let found = extract_emails(text).into_vec();
            let unique = found.iter().collect::<HashSet<_>>();
            assert_eq!(unique.len(), found.len(), "duplicates in {text:?}");
        }
    }

    #[test]
    fn test_idempotent() {
        for text in SAMPLES {
            assert_eq!(extract_emails(text), extract_emails(text));
        }
    }

    #[test]
    fn test_first_occurrence_order() {
        for text in SAMPLES {
            let found = extract_emails(text).into_vec();
            let positions = found
                .iter()
                .map(|email| text.find(email.as_str()).unwrap())
                .collect::<Vec<_>>();
            let mut sorted = positions.clone();
            sorted.sort_unstable();
            assert_eq!(positions, sorted, "order broken for {text:?}");
        }
    }
}
