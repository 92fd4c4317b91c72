use std::path::Path;

use unicode_normalization::UnicodeNormalization;

/// Fixed suffix appended to every cache file name.
pub const CACHE_SUFFIX: &str = ".cache";

/// Normalizes an arbitrary string into a filesystem-safe slug.
///
/// The transformation, in order:
///
/// 1. Decompose Unicode (NFKD) and drop any non-ASCII remnants, so `café`
///    becomes `cafe`.
/// 2. Strip every character that is not alphanumeric, underscore,
///    whitespace, or hyphen.
/// 3. Trim leading/trailing whitespace and lowercase.
/// 4. Collapse runs of whitespace and hyphens into a single hyphen.
///
/// This is a pure, total function: it performs no I/O and never fails, for
/// any input string. The empty string slugifies to the empty string.
///
/// # Examples
///
/// ```
/// use memorize_core::slug::slugify;
///
/// assert_eq!(slugify("My Report (final).txt"), "my-report-finaltxt");
/// assert_eq!(slugify("café du monde"), "cafe-du-monde");
/// assert_eq!(slugify("snake_case_name"), "snake_case_name");
/// assert_eq!(slugify("  spaced   out  "), "spaced-out");
/// ```
///
/// Only *whitespace* is trimmed at the edges; an input that genuinely
/// starts or ends with hyphens keeps a single collapsed hyphen there.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(|c| c.is_ascii()).collect();

    let kept: String = ascii
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '-')
        .collect();

    let trimmed = kept.trim().to_lowercase();

    let mut slug = String::with_capacity(trimmed.len());
    let mut in_separator = false;
    for c in trimmed.chars() {
        if c.is_whitespace() || c == '-' {
            if !in_separator {
                slug.push('-');
                in_separator = true;
            }
        } else {
            slug.push(c);
            in_separator = false;
        }
    }
    slug
}

/// Derives the cache file name for a (source file, function name) pair.
///
/// The name is `{slug of source file stem}_{slug of function name}.cache`.
/// The extension of the source file does not participate, so `pipeline.rs`
/// and `pipeline.txt` map to the same stem.
///
/// Two different functions whose names slugify identically collide on the
/// same cache file. This is an acknowledged gap, not expected in normal use.
///
/// # Examples
///
/// ```
/// use memorize_core::slug::cache_file_name;
/// use std::path::Path;
///
/// let name = cache_file_name(Path::new("src/pipeline.rs"), "fetch_rates");
/// assert_eq!(name, "pipeline_fetch_rates.cache");
/// ```
pub fn cache_file_name(source: &Path, function_name: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        "{}_{}{}",
        slugify(&stem),
        slugify(function_name),
        CACHE_SUFFIX
    )
}
