//! Integration tests for gzpipe
//!
//! These tests verify that the allocator shim, the streaming compressor and
//! the configuration layer work together.

use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

use gzpipe_alloc::{LimitedAllocator, TrackingAllocator};
use gzpipe_compression::{compress_to_vec, compress_to_vec_with, Compressor, GzipTrailer};
use gzpipe_config::{AllocatorKind, ConfigLoader};
use gzpipe_tests::test_utils::{
    generate_test_data, gunzip, gunzip_member, FailingSink, RecordingSink, TestDataPattern,
};
use gzpipe_types::{
    CompressionConfig, CompressionLevel, EngineStatus, ErrorKind, ScratchSize, GZIP_HEADER_LEN,
    GZIP_TRAILER_LEN,
};
use proptest::prelude::*;
use rstest::rstest;
use tempfile::TempDir;

fn small_scratch() -> CompressionConfig {
    CompressionConfig::new().with_scratch_size(ScratchSize::new(ScratchSize::MIN).unwrap())
}

#[test]
fn test_blarg_example() {
    let mut compressor = Compressor::new(Vec::new()).unwrap();
    assert_eq!(compressor.compress(b"blarg").unwrap(), 5);
    compressor.finish().unwrap();
    let gz = compressor.into_inner();

    assert_eq!(&gz[..3], &[0x1F, 0x8B, 0x08]);
    // No FEXTRA, FNAME or FCOMMENT.
    assert_eq!(gz[3], 0);

    let trailer = GzipTrailer::parse(&gz).unwrap();
    let mut crc = flate2::Crc::new();
    crc.update(b"blarg");
    assert_eq!(trailer.crc32, crc.sum());
    assert_eq!(trailer.isize, 5);
    assert_eq!(gunzip_member(&gz), b"blarg");
}

#[rstest]
#[case(TestDataPattern::Zeros, 4 * 1024 * 1024)]
#[case(TestDataPattern::Random, 3 * 1024 * 1024 + 1)]
#[case(TestDataPattern::Mixed, 1024 * 1024)]
#[case(TestDataPattern::Realistic, 2 * 1024 * 1024)]
#[case(TestDataPattern::Distinct, 1024 * 1024 + 255)]
fn test_multi_megabyte_roundtrip(#[case] pattern: TestDataPattern, #[case] size: usize) {
    let data = generate_test_data(size, pattern);
    let gz = compress_to_vec(&data, &CompressionConfig::default()).unwrap();

    assert_eq!(gunzip_member(&gz), data);
    assert_eq!(GzipTrailer::parse(&gz).unwrap(), GzipTrailer::expected_for(&data));
}

#[test]
fn test_empty_input_is_minimal_member() {
    let gz = compress_to_vec(&[], &CompressionConfig::default()).unwrap();
    assert!(gz.len() >= GZIP_HEADER_LEN + GZIP_TRAILER_LEN);
    let trailer = GzipTrailer::parse(&gz).unwrap();
    assert_eq!(trailer.crc32, 0);
    assert_eq!(trailer.isize, 0);
    assert!(gunzip_member(&gz).is_empty());
}

#[rstest]
#[case::nothing(0)]
#[case::one_scratch(ScratchSize::MIN)]
#[case::multiples_plus_remainder(ScratchSize::MIN * 31 + 9)]
fn test_scratch_drain_sizes(#[case] size: usize) {
    // Stored blocks make output size track input size closely.
    let config = small_scratch().with_level(CompressionLevel::new(0).unwrap());
    let data = generate_test_data(size, TestDataPattern::Random);

    let mut compressor = Compressor::with_config(RecordingSink::default(), &config).unwrap();
    compressor.compress(&data).unwrap();
    compressor.finish().unwrap();
    let stats = compressor.stats();
    let sink = compressor.into_inner();

    assert_eq!(stats.sink_writes as usize, sink.writes.len());
    assert!(sink.writes.iter().all(|n| (1..=ScratchSize::MIN).contains(n)));
    assert_eq!(gunzip_member(&sink.data), data);
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(40)]
fn test_failing_sink_stops_further_writes(#[case] fail_on: usize) {
    let config = small_scratch().with_level(CompressionLevel::new(0).unwrap());
    let data = generate_test_data(64 * 1024, TestDataPattern::Random);

    let mut compressor = Compressor::with_config(FailingSink::new(fail_on), &config).unwrap();
    let err = compressor.compress(&data).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    let io_err: io::Error = err.into();
    assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(compressor.get_ref().calls, fail_on);
}

#[test]
fn test_tracking_allocator_sees_every_engine_block_returned() {
    let tracker = TrackingAllocator::new();
    let data = generate_test_data(512 * 1024, TestDataPattern::Realistic);

    let gz = compress_to_vec_with(&data, &CompressionConfig::default(), tracker.clone()).unwrap();

    let snapshot = tracker.snapshot();
    assert!(snapshot.allocations >= 1);
    assert_eq!(snapshot.allocations, snapshot.deallocations);
    assert_eq!(snapshot.live_bytes, 0);
    // Window, hash chains and pending buffer are all at least 32 KiB combined.
    assert!(snapshot.peak_bytes >= 32 * 1024);
    assert_eq!(gunzip_member(&gz), data);
}

#[test]
fn test_memory_budget_below_engine_needs() {
    let budget = Arc::new(LimitedAllocator::new(32 * 1024));
    let tracker = TrackingAllocator::wrap(Arc::clone(&budget));

    let err = Compressor::with_allocator(Vec::new(), &CompressionConfig::default(), tracker.clone())
        .unwrap_err();

    assert_eq!(err.engine_status(), Some(EngineStatus::MemoryError));
    assert!(err.is_recoverable());
    assert_eq!(budget.in_use(), 0);
    let snapshot = tracker.snapshot();
    assert!(snapshot.failures >= 1);
    assert_eq!(snapshot.live_bytes, 0);
}

#[test]
fn test_memory_budget_large_enough() {
    let budget = Arc::new(LimitedAllocator::new(4 * 1024 * 1024));
    let data = generate_test_data(256 * 1024, TestDataPattern::Mixed);

    let gz = compress_to_vec_with(&data, &CompressionConfig::default(), Arc::clone(&budget))
        .unwrap();
    assert_eq!(budget.in_use(), 0);
    assert_eq!(gunzip_member(&gz), data);
}

#[test]
fn test_concatenated_members() {
    let mut stream = Vec::new();
    for part in [&b"first member, "[..], b"second member"] {
        let mut compressor = Compressor::new(&mut stream).unwrap();
        compressor.compress(part).unwrap();
        compressor.finish().unwrap();
    }
    assert_eq!(gunzip(&stream), b"first member, second member");
}

#[test]
fn test_io_copy_through_compressor() {
    let data = generate_test_data(300_000, TestDataPattern::Realistic);
    let mut compressor = Compressor::new(RecordingSink::default()).unwrap();

    let copied = io::copy(&mut data.as_slice(), &mut compressor).unwrap();
    compressor.flush().unwrap();
    compressor.finish().unwrap();

    assert_eq!(copied, data.len() as u64);
    let sink = compressor.into_inner();
    assert_eq!(sink.flushes, 1);
    assert_eq!(gunzip_member(&sink.data), data);
}

#[test]
fn test_file_config_drives_compressor() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("gzpipe.yaml");
    fs::write(
        &config_path,
        "compression:\n  level: 1\n  strategy: filtered\n  scratch_size: 128\nmemory:\n  allocator: tracking\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_path).unwrap();
    assert_eq!(config.memory.allocator, AllocatorKind::Tracking);
    assert_eq!(config.compression.scratch_size.get(), 128);

    let data = generate_test_data(100_000, TestDataPattern::Mixed);
    let mut compressor =
        Compressor::with_config(RecordingSink::default(), &config.compression).unwrap();
    compressor.compress(&data).unwrap();
    compressor.finish().unwrap();

    let sink = compressor.into_inner();
    assert!(sink.writes.iter().all(|n| *n <= 128));
    assert_eq!(gunzip_member(&sink.data), data);
}

#[test]
fn test_level_extremes_differ_in_size() {
    let data = generate_test_data(1024 * 1024, TestDataPattern::Realistic);
    let fast = compress_to_vec(
        &data,
        &CompressionConfig::new().with_level(CompressionLevel::new(1).unwrap()),
    )
    .unwrap();
    let best = compress_to_vec(
        &data,
        &CompressionConfig::new().with_level(CompressionLevel::new(9).unwrap()),
    )
    .unwrap();

    assert!(best.len() <= fast.len());
    assert_eq!(gunzip_member(&fast), gunzip_member(&best));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_split_writes_roundtrip_for_any_scratch_size(
        data in prop::collection::vec(any::<u8>(), 0..48 * 1024),
        split in 1usize..9000,
        scratch in ScratchSize::MIN..=16 * 1024usize,
        level in -1i32..=9,
    ) {
        let config = CompressionConfig::new()
            .with_level(CompressionLevel::new(level).unwrap())
            .with_scratch_size(ScratchSize::new(scratch).unwrap());

        let mut compressor = Compressor::with_config(RecordingSink::default(), &config).unwrap();
        for chunk in data.chunks(split) {
            prop_assert_eq!(compressor.compress(chunk).unwrap(), chunk.len());
        }
        compressor.finish().unwrap();
        let sink = compressor.into_inner();

        prop_assert!(sink.writes.iter().all(|n| (1..=scratch).contains(n)));
        prop_assert_eq!(GzipTrailer::parse(&sink.data).unwrap(), GzipTrailer::expected_for(&data));
        prop_assert_eq!(gunzip_member(&sink.data), data);
    }
}
