const DOC_WEIGHT: f64 = 0.4;
const EXAMPLE_WEIGHT: f64 = 0.3;
const COMPLEXITY_WEIGHT: f64 = 0.3;
const CONVENTIONAL_BONUS: f64 = 0.1;

/// Beyond this many documentation or example files, more of them stop
/// improving the score.
const DENSITY_CAP: usize = 5;

/// Code-file count at which the complexity penalty bottoms out.
const CODE_SATURATION: usize = 1000;

const CONVENTIONAL_DIRS: &[&str] = &["src", "lib", "test", "docs", "examples"];
const DOC_EXTENSIONS: &[&str] = &["md", "rst", "adoc", "txt"];
const CODE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx"];

/// Weighted static analysis of a repository's file listing: documentation
/// and example density reward approachability, raw code volume penalizes
/// it, and a fully conventional layout earns a small bonus.
#[expect(clippy::cast_precision_loss, reason = "counts fit comfortably in f64")]
pub(crate) fn score(files: &[String]) -> f64 {
    let docs = files.iter().filter(|f| is_doc_file(f)).count();
    let examples = files.iter().filter(|f| is_example_file(f)).count();
    let code = files.iter().filter(|f| is_code_file(f)).count();

    let doc_density = docs.min(DENSITY_CAP) as f64 / DENSITY_CAP as f64;
    let example_density = examples.min(DENSITY_CAP) as f64 / DENSITY_CAP as f64;
    let simplicity = 1.0 - code.min(CODE_SATURATION) as f64 / CODE_SATURATION as f64;

    let mut total = DOC_WEIGHT * doc_density + EXAMPLE_WEIGHT * example_density + COMPLEXITY_WEIGHT * simplicity;

    if CONVENTIONAL_DIRS.iter().all(|dir| has_top_level_dir(files, dir)) {
        total += CONVENTIONAL_BONUS;
    }

    total.clamp(0.0, 1.0)
}

fn extension(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(_, ext)| ext)
}

fn is_doc_file(path: &str) -> bool {
    extension(path).is_some_and(|ext| DOC_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
}

fn is_example_file(path: &str) -> bool {
    path.split('/').any(|segment| {
        let lower = segment.to_ascii_lowercase();
        lower.starts_with("example") || lower.starts_with("demo")
    })
}

fn is_code_file(path: &str) -> bool {
    extension(path).is_some_and(|ext| CODE_EXTENSIONS.contains(&ext))
}

fn has_top_level_dir(files: &[String], dir: &str) -> bool {
    files
        .iter()
        .any(|f| f.split_once('/').is_some_and(|(first, _)| first.eq_ignore_ascii_case(dir)))
}
