use criterion::{Criterion, criterion_group, criterion_main};
use igen::compiler_flags;
use igen::extract::{
    Declaration, DocumentedInFile, Extractor, Filters, MarkerSet, NamespaceOrMarker, Param,
    SourceScanner,
};
use igen::manifest::ArtifactSpec;
use igen::render::{InterfaceRenderer, Renderer};
use igen::staleness::ContentHash;
use std::fs;
use std::hint::black_box;
use std::path::PathBuf;

const RAW_FLAGS: &[&str] = &[
    "-MMD", "-MP", "-MF", "obj/kvs.d", "-std=c++14", "-Wall", "-Wextra", "-Iinclude",
    "-Idep/include", "-DTOGO_DEBUG", "-O2", "-MTobj/kvs.o",
];

/// A source file with `count` documented functions and some noise between them.
fn synthetic_source(count: usize) -> String {
    let mut src = String::from("#include <togo/kvs/kvs.hpp>\n\nnamespace togo {\n\n");
    for i in 0..count {
        src.push_str(&format!(
            "/// Function {i}.\n///\n/// Does thing {i}.\nu32 kvs::func_{i}(KVS& kvs, u32 const x IGEN_DEFAULT({i})) {{\n\tchar const* s = \"{{}}\";\n\treturn x + '}}';\n}}\n\n"
        ));
        src.push_str("// unrelated comment\nstatic void helper() {}\n\n");
    }
    src.push_str("} // namespace togo\n");
    src
}

fn spec(source: PathBuf) -> ArtifactSpec {
    ArtifactSpec {
        slug: "kvs/kvs".to_string(),
        sources: vec![source],
        source_labels: vec!["src/togo/kvs/kvs.cpp".to_string()],
        gen_path: PathBuf::from("src/togo/kvs/kvs.gen_interface"),
        gen_rel: PathBuf::from("src/togo/kvs/kvs.gen_interface"),
        namespace: "togo::kvs".to_string(),
        doc_group: "lib_core_kvs".to_string(),
    }
}

fn bench_scan(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kvs.cpp");
    fs::write(&path, synthetic_source(200)).unwrap();
    let artifact = spec(path.clone());
    let flags = compiler_flags::sanitize(RAW_FLAGS, &[]);
    let filters = Filters {
        syntax: &DocumentedInFile,
        declaration: &NamespaceOrMarker,
        artifact: &artifact,
    };

    c.bench_function("scan_200_functions", |b| {
        b.iter(|| SourceScanner.extract(black_box(&path), &flags, &filters).unwrap())
    });
}

fn bench_sanitize(c: &mut Criterion) {
    c.bench_function("sanitize_flags", |b| {
        b.iter(|| compiler_flags::sanitize(black_box(RAW_FLAGS), &[]))
    });
}

fn bench_render_and_hash(c: &mut Criterion) {
    let artifact = spec(PathBuf::from("kvs.cpp"));
    let declarations: Vec<Declaration> = (0..200)
        .map(|i| Declaration {
            file: PathBuf::from("kvs.cpp"),
            line: i * 8,
            namespace: if i % 3 == 0 { "togo".into() } else { "togo::kvs".into() },
            name: format!("func_{i}"),
            return_type: "u32".to_string(),
            params: vec![
                Param {
                    text: "KVS& kvs".to_string(),
                    default: None,
                },
                Param {
                    text: "u32 const x".to_string(),
                    default: Some(i.to_string()),
                },
            ],
            suffix: String::new(),
            doc: vec![format!("Function {i}."), String::new(), "Details.".to_string()],
            markers: MarkerSet::default(),
        })
        .collect();

    c.bench_function("render_and_hash_200", |b| {
        b.iter(|| {
            let text = InterfaceRenderer
                .render(black_box(&declarations), &artifact)
                .unwrap();
            ContentHash::of(text.as_bytes())
        })
    });
}

criterion_group!(benches, bench_scan, bench_sanitize, bench_render_and_hash);
criterion_main!(benches);
