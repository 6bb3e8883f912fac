//! Output file naming
//!
//! Archive paths are reduced to their plain file name and normalized so
//! that every spelling of a path maps to one output file.

use crate::storage::file_id_from_name;

/// File name after the last `\` or `/`
pub fn plain_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Word-case a file name: lowercase extension, then each alphabetic run
/// starts upper-case and continues lower-case.
///
/// A name without a `.` is lowercased entirely.
pub fn fix_name_case(name: &str) -> String {
    let mut bytes = name.as_bytes().to_vec();
    let Some(dot) = bytes.iter().rposition(|b| *b == b'.') else {
        bytes.make_ascii_lowercase();
        return String::from_utf8_lossy(&bytes).into_owned();
    };

    bytes[dot..].make_ascii_lowercase();
    for i in (0..dot).rev() {
        let after_alpha = i > 0 && bytes[i - 1].is_ascii_alphabetic();
        if after_alpha {
            bytes[i] = bytes[i].to_ascii_lowercase();
        } else {
            bytes[i] = bytes[i].to_ascii_uppercase();
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Replace spaces with `_`, leaving the last three characters alone
pub fn fix_name_spaces(name: &str) -> String {
    let keep = name.len().saturating_sub(3);
    name.char_indices()
        .map(|(i, c)| if i < keep && c == ' ' { '_' } else { c })
        .collect()
}

/// Canonical output name of an archive path.
///
/// `FILE%08X.xxx` placeholders are kept verbatim so that file id lookups
/// and output checks agree.
pub fn canonical_name(path: &str) -> String {
    let plain = plain_name(path);
    if file_id_from_name(plain).is_some() {
        return plain.to_string();
    }
    fix_name_spaces(&fix_name_case(plain))
}

/// Canonical output name of a doodad model; `.mdx`/`.mdl` become `.m2`
pub fn model_output_name(path: &str) -> String {
    let name = canonical_name(path);
    match name.rsplit_once('.') {
        Some((stem, "mdx" | "mdl")) => format!("{stem}.m2"),
        _ => name,
    }
}

/// Archive path a model is stored under; `.mdx`/`.mdl` references name the `.m2` file
pub fn model_archive_name(path: &str) -> String {
    match path.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("mdx") || ext.eq_ignore_ascii_case("mdl") => {
            format!("{stem}.m2")
        }
        _ => path.to_string(),
    }
}

/// Whether a root-looking name is a numbered group file (`Name_000.wmo`).
///
/// Counts digits in the four characters starting at the last `_`; exactly
/// three marks a group. This only looks at the file name.
pub fn is_group_fragment(name: &str) -> bool {
    let plain = plain_name(name);
    let Some(underscore) = plain.rfind('_') else {
        return false;
    };
    plain.as_bytes()[underscore..]
        .iter()
        .take(4)
        .filter(|b| b.is_ascii_digit())
        .count()
        == 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("World\\wmo\\Azeroth\\Buildings\\Inn.wmo", "Inn.wmo")]
    #[test_case("World/wmo/inn.wmo", "inn.wmo")]
    #[test_case("inn.wmo", "inn.wmo")]
    fn test_plain_name(path: &str, expected: &str) {
        assert_eq!(plain_name(path), expected);
    }

    #[test_case("STORMWIND_INN.WMO", "Stormwind_Inn.wmo")]
    #[test_case("goldshire inn.WMO", "Goldshire Inn.wmo")]
    #[test_case("ab12cd.M2", "Ab12Cd.m2")]
    #[test_case("NOEXT", "noext")]
    fn test_fix_name_case(name: &str, expected: &str) {
        assert_eq!(fix_name_case(name), expected);
    }

    #[test]
    fn test_fix_name_spaces() {
        assert_eq!(fix_name_spaces("Goldshire Inn.wmo"), "Goldshire_Inn.wmo");
        assert_eq!(fix_name_spaces("a b"), "a b");
        assert_eq!(fix_name_spaces("a b c"), "a_b c");
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(
            canonical_name("World\\wmo\\Goldshire INN.wmo"),
            "Goldshire_Inn.wmo"
        );
        assert_eq!(canonical_name("FILE0001ABCD.xxx"), "FILE0001ABCD.xxx");
    }

    #[test_case("World\\Tree01.mdx", "Tree01.m2")]
    #[test_case("World\\LAMP.MDL", "Lamp.m2")]
    #[test_case("World\\barrel.m2", "Barrel.m2")]
    fn test_model_output_name(path: &str, expected: &str) {
        assert_eq!(model_output_name(path), expected);
    }

    #[test_case("World\\Tree01.MDX", "World\\Tree01.m2")]
    #[test_case("World\\Lamp.mdl", "World\\Lamp.m2")]
    #[test_case("World\\Barrel.M2", "World\\Barrel.M2")]
    #[test_case("FILE0001ABCD.xxx", "FILE0001ABCD.xxx")]
    fn test_model_archive_name(path: &str, expected: &str) {
        assert_eq!(model_archive_name(path), expected);
    }

    #[test_case("Stormwind_000.wmo", true)]
    #[test_case("Stormwind_012.wmo", true)]
    #[test_case("Stormwind.wmo", false)]
    #[test_case("Stormwind_Inn.wmo", false)]
    #[test_case("Dock_01.wmo", false)]
    #[test_case("Stormwind_1234.wmo", true)]
    fn test_group_fragment(name: &str, expected: bool) {
        assert_eq!(is_group_fragment(name), expected);
    }
}
