//! End-to-end test wiring the TAF reconstructor into the FASTA materializer, the way a host would
//! chain `MafBlockSource::query` into `materialize_fasta`.

use maf_search::taf::TafReconstructor;
use maf_search::{materialize_fasta, FastaOptions};

#[test]
fn taf_blocks_feed_directly_into_fasta_materialization() {
  let body = concat!(
    "#taf version:1\n",
    "ACGT ; i 0 hg38.chr1 100 + 1000 i 1 mm10.chr1 200 + 2000\n",
    "ACGT\n",
    "ACGT\n",
    "AC-- ; g 0 4 g 1 4\n",
    "AC\n",
    "AC\n",
  );

  let reconstructor = TafReconstructor::new(body, 100, 110, None, None);
  let visible = vec!["hg38".to_string(), "mm10".to_string()];
  let options = FastaOptions { show_all_letters: true, include_insertions: false };

  let out = materialize_fasta(100, 110, &visible, reconstructor, options);

  // First block covers ref [100, 103). The second block's rows carry their start forward by
  // their own aligned span (3) then the `g 0 4` / `g 1 4` advance, landing at [107, 110); the
  // 4 columns in between are untouched gap-fill.
  assert_eq!(&out["hg38"][0..3], b"aaa");
  assert_eq!(&out["mm10"][0..3], b"ccc");
  assert_eq!(&out["hg38"][3..7], b"----");
  assert_eq!(&out["hg38"][7..10], b"aaa");
  assert_eq!(&out["mm10"][7..10], b"ccc");
}
