/*
    src/filter_stream/daa/parts.rs

    Split-archive filename derivation (spec.md §4.3 step 4, §4.3 step 7,
    §6.4's "0/1/2-indexed, 3-digit/4-digit, same-extension/incrementing-
    extension" naming note). A split image's descriptor names a
    "fingerprint" (99, 512, or 101) selecting which of three historical
    naming schemes the remaining volumes follow; this module turns a
    fingerprint and a base filename into the ordered list of part paths.
*/
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartNamingScheme {
    /// `name.part1.daa`, `name.part2.daa`, ... — part 0 keeps the original
    /// filename verbatim.
    IncrementingPart,
    /// `name.daa`, `name.d00`, `name.d01`, ... — part 0 keeps the original
    /// extension, later parts zero-pad a 2-digit counter into it.
    NumberedExtension,
    /// `name.daa`, `name.001`, `name.002`, ... — same shape as
    /// `NumberedExtension` but with a 3-digit counter and no leading
    /// format-letter.
    NumericSuffix,
}

pub fn scheme_for_fingerprint(fingerprint: u32) -> Option<PartNamingScheme> {
    match fingerprint {
        99 => Some(PartNamingScheme::IncrementingPart),
        512 => Some(PartNamingScheme::NumberedExtension),
        101 => Some(PartNamingScheme::NumericSuffix),
        _ => None,
    }
}

/// Derive the on-disk path of part `index` (0-based, where part 0 is
/// `base`) of a `num_volumes`-volume split archive using `scheme`.
pub fn part_path(base: &Path, index: u32, scheme: PartNamingScheme) -> PathBuf {
    if index == 0 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("daa");
    let dir = base.parent().unwrap_or_else(|| Path::new(""));

    let filename = match scheme {
        PartNamingScheme::IncrementingPart => format!("{stem}.part{index}.{ext}"),
        PartNamingScheme::NumberedExtension => format!("{stem}.{}{:02}", &ext[..1.min(ext.len())], index - 1),
        PartNamingScheme::NumericSuffix => format!("{stem}.{:03}", index),
    };
    dir.join(filename)
}

/// Build the full ordered path list for a `num_volumes`-volume split
/// archive rooted at `base`.
pub fn part_paths(base: &Path, num_volumes: u32, scheme: PartNamingScheme) -> Vec<PathBuf> {
    (0..num_volumes).map(|i| part_path(base, i, scheme)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_maps_to_expected_scheme() {
        assert_eq!(scheme_for_fingerprint(99), Some(PartNamingScheme::IncrementingPart));
        assert_eq!(scheme_for_fingerprint(512), Some(PartNamingScheme::NumberedExtension));
        assert_eq!(scheme_for_fingerprint(101), Some(PartNamingScheme::NumericSuffix));
        assert_eq!(scheme_for_fingerprint(7), None);
    }

    #[test]
    fn incrementing_part_scheme_names_parts() {
        let base = Path::new("/images/game.daa");
        let paths = part_paths(base, 3, PartNamingScheme::IncrementingPart);
        assert_eq!(paths[0], Path::new("/images/game.daa"));
        assert_eq!(paths[1], Path::new("/images/game.part1.daa"));
        assert_eq!(paths[2], Path::new("/images/game.part2.daa"));
    }

    #[test]
    fn numeric_suffix_scheme_zero_pads_to_three_digits() {
        let base = Path::new("image.daa");
        let paths = part_paths(base, 2, PartNamingScheme::NumericSuffix);
        assert_eq!(paths[0], Path::new("image.daa"));
        assert_eq!(paths[1], Path::new("image.001"));
    }

    #[test]
    fn numbered_extension_scheme_reuses_format_letter() {
        let base = Path::new("image.daa");
        let paths = part_paths(base, 2, PartNamingScheme::NumberedExtension);
        assert_eq!(paths[1], Path::new("image.d00"));
    }
}
