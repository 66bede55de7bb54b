use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use bridgebook::collation::NameCollator;
use bridgebook::folder_index::{EntryFormat, FolderIndex};
use bridgebook::host::DocumentHost;
use bridgebook::storage::{DocumentKind, SharedStore};
use bridgebook::timefmt;

const KANA: &[&str] = &["あ", "か", "さ", "た", "な", "カ", "サ", "橋", "川", "A", "b", "Z"];

fn gen_names(n: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let len = rng.gen_range(2..6);
            let mut s: String = (0..len).map(|_| KANA[rng.gen_range(0..KANA.len())]).collect();
            s.push_str(&format!("橋{}", i));
            s
        })
        .collect()
}

fn bench_collation(c: &mut Criterion) {
    let mut group = c.benchmark_group("collation_sort");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);
    for &n in &[1_000usize, 10_000usize] {
        let names = gen_names(n, 0xB41D_6E);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("japanese", n.to_string()), &n, |b, _| {
            let collator = NameCollator::japanese().unwrap();
            b.iter(|| {
                let mut v = names.clone();
                v.sort_by(|a, b| collator.compare(a, b));
                criterion::black_box(&v);
            });
        });
        group.bench_with_input(BenchmarkId::new("code_units", n.to_string()), &n, |b, _| {
            b.iter(|| {
                let mut v = names.clone();
                v.sort();
                criterion::black_box(&v);
            });
        });
    }
    group.finish();
}

// folders x documents-per-folder, two levels deep
fn build_tree(store: &SharedStore, folders: usize, docs_per_folder: usize) -> String {
    let root = store.create_root_folder("bench").unwrap();
    let names = gen_names(folders * docs_per_folder, 0xF01D_E2);
    let mut it = names.iter();
    for f in 0..folders {
        let parent = if f % 2 == 0 { root.id.clone() } else {
            store.0.lock().create_folder(Some(root.id.as_str()), &format!("sub{}", f)).unwrap().id
        };
        let folder = store.0.lock().create_folder(Some(parent.as_str()), &format!("班{}", f)).unwrap();
        for _ in 0..docs_per_folder {
            let name = it.next().unwrap();
            let doc = store.create_document(name, DocumentKind::Spreadsheet).unwrap();
            store.move_document(&doc.id, &folder.id).unwrap();
        }
    }
    root.id
}

fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_all_documents");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);
    for &(folders, per) in &[(10usize, 10usize), (40usize, 25usize)] {
        let tmp = tempfile::tempdir().unwrap();
        let store = SharedStore::new(tmp.path()).unwrap();
        let root = build_tree(&store, folders, per);
        let format = EntryFormat { public_base_url: "http://127.0.0.1:8787".into(), offset: timefmt::fixed_offset(540).unwrap() };
        let label = format!("{}x{}", folders, per);
        group.throughput(Throughput::Elements((folders * per) as u64));
        group.bench_with_input(BenchmarkId::new("disk", &label), &label, |b, _| {
            b.iter(|| {
                let entries = FolderIndex::new(&store).list_all_documents(&root, &format).unwrap();
                criterion::black_box(entries.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_collation, bench_listing);
criterion_main!(benches);
