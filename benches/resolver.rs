//! Micro-benchmarks for manifest parsing, group-filter evaluation and
//! full resolver runs over an on-disk manifest graph.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;

use git_ws::groups::{GroupFilter, GroupSelection};
use git_ws::manifest::{ManifestSpec, MANIFEST_PATH_DEFAULT};
use git_ws::resolver::{OriginUrls, Resolver};
use git_ws::workspace::Workspace;

fn manifest_content(deps: usize) -> String {
    let mut content = String::from("version = 1\n[defaults]\nrevision = \"main\"\n");
    for index in 0..deps {
        content.push_str(&format!(
            "[[dependencies]]\nname = \"lib{index}\"\nurl = \"https://example.com/lib{index}\"\n"
        ));
        if index % 2 == 1 {
            content.push_str(&format!("groups = [\"g{}\"]\n", index % 5));
        }
    }
    content
}

fn bench_manifest_parse(c: &mut Criterion) {
    let content = manifest_content(50);
    c.bench_function("manifest_parse_50_deps", |b| {
        b.iter(|| {
            ManifestSpec::parse(black_box(&content), Path::new("git-ws.toml")).unwrap()
        })
    });
}

fn bench_group_filters(c: &mut Criterion) {
    let filters: Vec<GroupFilter> = ["+g0", "-g1", "+g2@lib7", "-g0", "+g1"]
        .iter()
        .map(|expr| GroupFilter::parse(expr).unwrap())
        .collect();
    let selection = GroupSelection::new(&filters, &[]);
    let groups: Vec<String> = vec!["g0".to_string(), "g1".to_string()];
    c.bench_function("group_filter_decide", |b| {
        b.iter(|| selection.decide(black_box("lib7"), black_box(&groups), false))
    });
}

struct NoOrigins;

impl OriginUrls for NoOrigins {
    fn origin_url(&self, _project_dir: &Path) -> Option<String> {
        None
    }
}

fn bench_resolve(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(MANIFEST_PATH_DEFAULT),
        manifest_content(50),
    )
    .unwrap();
    let workspace =
        Workspace::init(dir.path(), None, MANIFEST_PATH_DEFAULT, Vec::new(), None).unwrap();

    c.bench_function("resolve_50_deps", |b| {
        b.iter(|| {
            Resolver::new(black_box(&workspace))
                .with_origins(&NoOrigins)
                .resolve()
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_manifest_parse,
    bench_group_filters,
    bench_resolve
);
criterion_main!(benches);
