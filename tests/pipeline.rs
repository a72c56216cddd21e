use image::{DynamicImage, Rgb, RgbImage};
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;

use logoclust::core::{ClusterPartitioner, ClusterReport, CorpusScanner, GroupKind};

fn png_bytes(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb(pixel(x, y)));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Horizontal red ramp; visually identical at any resolution, so two sizes
/// of it encode to different bytes but near-identical perceptual features.
fn red_ramp(width: u32, height: u32) -> Vec<u8> {
    png_bytes(width, height, |x, _| {
        [((x * 255) / width.max(1)) as u8, 0, 0]
    })
}

#[test]
fn clusters_a_mixed_corpus_end_to_end() {
    let dir = TempDir::new().unwrap();

    // Byte-identical content under two different extensions.
    let checker = png_bytes(40, 40, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            [250, 240, 10]
        } else {
            [20, 30, 220]
        }
    });
    fs::write(dir.path().join("brand_a.png"), &checker).unwrap();
    fs::write(dir.path().join("brand_a_copy.ico"), &checker).unwrap();

    // Same artwork at two resolutions: different bytes, similar signature.
    fs::write(dir.path().join("ramp_small.png"), red_ramp(100, 50)).unwrap();
    fs::write(dir.path().join("ramp_large.png"), red_ramp(200, 100)).unwrap();

    // A vector logo with declared geometry, nothing like the rasters.
    fs::write(
        dir.path().join("mark.svg"),
        r#"<svg width="200" height="100" fill="blue"><rect/></svg>"#,
    )
    .unwrap();

    // Readable but undecodable bytes.
    fs::write(dir.path().join("corrupt.png"), b"these are not pixels").unwrap();

    let scanner = CorpusScanner::new();
    let files = scanner.discover(dir.path()).unwrap();
    assert_eq!(files.len(), 6);

    let signatures = scanner.extract_all(dir.path(), &files, |_| {});
    assert_eq!(signatures.len(), 6);
    assert!(signatures.iter().all(|s| s.has_valid_hash()));

    let partitioner = ClusterPartitioner::new();
    let groups = partitioner.partition(&signatures);
    let report = ClusterReport::build(&groups, files.len(), partitioner.threshold());

    // Partition invariant: every file exactly once.
    assert!(report.is_partition_of(&files));

    // Exact-duplicate priority: identical bytes, different extensions.
    let exact: Vec<_> = groups.iter().filter(|g| g.kind == GroupKind::Exact).collect();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].members, vec!["brand_a.png", "brand_a_copy.ico"]);
    assert_eq!(exact[0].average_similarity, 1.0);

    // The two ramp renditions are not byte-identical but share a group.
    let ramp_group = groups
        .iter()
        .find(|g| g.members.iter().any(|m| m == "ramp_small.png"))
        .unwrap();
    assert!(ramp_group.members.iter().any(|m| m == "ramp_large.png"));
    assert_eq!(ramp_group.kind, GroupKind::Similar);
    assert!(ramp_group.average_similarity >= partitioner.threshold());

    // The vector mark must not ride along with the exact pair.
    assert!(!exact[0].members.iter().any(|m| m == "mark.svg"));

    // The undecodable file degrades to a placeholder signature far from
    // everything else here, so it lands in its own singleton.
    let corrupt_group = groups
        .iter()
        .find(|g| g.members.iter().any(|m| m == "corrupt.png"))
        .unwrap();
    assert_eq!(corrupt_group.kind, GroupKind::Unique);
    assert_eq!(corrupt_group.members, vec!["corrupt.png"]);

    // Reports land on disk and round-trip.
    let json_path = dir.path().join("logo_groups.json");
    let summary_path = dir.path().join("logo_summary.txt");
    report.write_json(&json_path).unwrap();
    report.write_summary_file(&summary_path).unwrap();

    let loaded: ClusterReport =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert!(loaded.is_partition_of(&files));
    assert_eq!(loaded.metadata.total_files, 6);

    let summary = fs::read_to_string(&summary_path).unwrap();
    assert!(summary.contains("Total files processed: 6"));
}

#[test]
fn unreadable_corpus_root_is_a_configuration_error() {
    let scanner = CorpusScanner::new();
    assert!(scanner.discover(std::path::Path::new("/no/such/corpus")).is_err());
}
