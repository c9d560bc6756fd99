use std::path::Path;

use bytes::Bytes;
use pagecodec::encoding::factory::{DeltaEncoderFactory, EncoderFactory, PlainEncoderFactory};
use pagecodec::file::container::{MAGIC, PageFileReader, PageFileWriter};
use pagecodec::file::{FileReader, FileWriter, RowGroup};
use pagecodec::page::{EncodedPage, PageLimits};
use pagecodec::page::decoder::ColumnPageDecoder;
use pagecodec::page::encoder::ColumnPageEncoder;
use pagecodec::page::header::HEADER_LEN;
use pagecodec::pipeline::decode_column;
use pagecodec::schema::{ColumnDescriptor, PhysicalType, Repetition, Schema};
use pagecodec::value::{ColumnChunk, Slot, Value};
use pagecodec::{Encoding, ErrorKind, RewriteConfig, rewrite_file, write_row_group};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_value(rng: &mut StdRng, physical_type: PhysicalType) -> Value {
    match physical_type {
        PhysicalType::Boolean => Value::Boolean(rng.random_bool(0.5)),
        PhysicalType::Int32 => Value::Int32(rng.random()),
        PhysicalType::Int64 => Value::Int64(rng.random()),
        PhysicalType::Float => Value::Float(rng.random_range(-1000.0..1000.0)),
        PhysicalType::Double => Value::Double(rng.random_range(-1.0e9..1.0e9)),
        PhysicalType::ByteArray => {
            let len = rng.random_range(0..24);
            let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            Value::ByteArray(Bytes::from(bytes))
        }
    }
}

fn random_slots(rng: &mut StdRng, descr: &ColumnDescriptor, n: usize, null_prob: f64) -> Vec<Slot> {
    (0..n)
        .map(|_| {
            if descr.repetition.is_nullable() && rng.random_bool(null_prob) {
                None
            } else {
                Some(random_value(rng, descr.physical_type))
            }
        })
        .collect()
}

fn read_all_row_groups(path: &Path) -> (Schema, Vec<RowGroup>) {
    let mut reader = Box::new(PageFileReader::open(path).unwrap());
    let schema = reader.schema().clone();
    let mut row_groups = Vec::new();
    while let Some(rg) = reader.next_row_group().unwrap() {
        row_groups.push(rg);
    }
    reader.close().unwrap();
    (schema, row_groups)
}

fn decode_file(path: &Path) -> Vec<Vec<ColumnChunk>> {
    let (schema, row_groups) = read_all_row_groups(path);
    row_groups
        .iter()
        .map(|rg| {
            schema
                .columns()
                .iter()
                .zip(&rg.columns)
                .map(|(descr, pages)| decode_column(descr, pages, rg.num_rows).unwrap())
                .collect()
        })
        .collect()
}

fn encode_pages(
    descr: &ColumnDescriptor,
    factory: &dyn EncoderFactory,
    limits: PageLimits,
    slots: &[Slot],
) -> Vec<EncodedPage> {
    let mut enc = ColumnPageEncoder::try_new(descr.clone(), factory, limits).unwrap();
    for slot in slots {
        enc.put(slot.as_ref()).unwrap();
    }
    enc.finish().unwrap().0
}

#[test]
fn rewrite_three_row_groups_with_delta() {
    logutil::init_test();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pgcf");
    let output = dir.path().join("output.pgcf");

    let schema = Schema::try_new([
        ColumnDescriptor::required("id", PhysicalType::Int32),
        ColumnDescriptor::optional("payload", PhysicalType::ByteArray),
    ])
    .unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let mut expected = Vec::new();

    let mut writer = Box::new(PageFileWriter::create(&input, schema.clone()).unwrap());
    for rg in 0..3 {
        let ids: Vec<Slot> = (0..1000)
            .map(|i| Some(Value::Int32(rg * 1000 + i + rng.random_range(-3..=3))))
            .collect();
        let payloads = random_slots(&mut rng, &schema.columns()[1], 1000, 0.1);
        let chunks = vec![
            ColumnChunk::try_from_slots(&schema.columns()[0], ids).unwrap(),
            ColumnChunk::try_from_slots(&schema.columns()[1], payloads).unwrap(),
        ];
        write_row_group(
            writer.as_mut(),
            &PlainEncoderFactory,
            PageLimits::default(),
            &chunks,
        )
        .unwrap();
        expected.push(chunks);
    }
    writer.close().unwrap();

    let summary = rewrite_file(&input, &output, RewriteConfig::new(4096, Encoding::Delta)).unwrap();
    assert_eq!(3, summary.row_groups);
    assert_eq!(3000, summary.rows);
    assert_eq!(Encoding::Delta, summary.columns[0].encoding);
    assert_eq!(Encoding::Plain, summary.columns[1].encoding);

    let (out_schema, row_groups) = read_all_row_groups(&output);
    assert_eq!(schema, out_schema);
    assert_eq!(3, row_groups.len());

    for rg in &row_groups {
        assert_eq!(1000, rg.num_rows);
        for page in &rg.columns[0] {
            assert_eq!(Encoding::Delta, page.encoding);
            assert!(page.len() <= 4096);
        }
        for page in &rg.columns[1] {
            assert_eq!(Encoding::Plain, page.encoding);
        }
    }

    assert_eq!(expected, decode_file(&output));
}

#[test]
fn round_trip_every_type() {
    let types = [
        PhysicalType::Boolean,
        PhysicalType::Int32,
        PhysicalType::Int64,
        PhysicalType::Float,
        PhysicalType::Double,
        PhysicalType::ByteArray,
    ];
    let factories: [&dyn EncoderFactory; 2] = [&PlainEncoderFactory, &DeltaEncoderFactory];
    let mut rng = StdRng::seed_from_u64(7);

    for physical_type in types {
        for repetition in [Repetition::Required, Repetition::Optional, Repetition::Repeated] {
            let descr = ColumnDescriptor::new("c", physical_type, repetition);
            for factory in factories {
                for (n, null_prob) in [(0, 0.0), (1, 0.0), (257, 0.3), (500, 1.0)] {
                    let slots = random_slots(&mut rng, &descr, n, null_prob);
                    let limits = PageLimits {
                        page_size_bytes: 256,
                        page_row_count_limit: 100,
                    };
                    let pages = encode_pages(&descr, factory, limits, &slots);

                    let mut decoded = Vec::new();
                    for page in &pages {
                        ColumnPageDecoder::for_page(page, &descr)
                            .unwrap()
                            .read_into(&mut decoded)
                            .unwrap();
                    }
                    assert_eq!(
                        slots,
                        decoded,
                        "type: {physical_type}, repetition: {repetition:?}, encoding: {}, n: {n}",
                        factory.encoding()
                    );
                }
            }
        }
    }
}

#[test]
fn pages_respect_ceilings() {
    let descr = ColumnDescriptor::optional("v", PhysicalType::Int64);
    let mut rng = StdRng::seed_from_u64(99);
    let slots = random_slots(&mut rng, &descr, 5000, 0.2);

    let cases = [(64, 10), (200, 1000), (4096, 4096), (1 << 20, 7)];
    for (page_size_bytes, page_row_count_limit) in cases {
        let limits = PageLimits {
            page_size_bytes,
            page_row_count_limit,
        };
        for factory in [&PlainEncoderFactory as &dyn EncoderFactory, &DeltaEncoderFactory] {
            let pages = encode_pages(&descr, factory, limits, &slots);

            let total: usize = pages.iter().map(|p| p.num_rows).sum();
            assert_eq!(slots.len(), total);

            for page in &pages {
                assert!(page.num_rows >= 1);
                assert!(page.num_rows <= page_row_count_limit);
                // A single row page may exceed the byte ceiling, nothing else.
                if page.num_rows > 1 {
                    assert!(
                        page.len() <= page_size_bytes,
                        "page of {} bytes, limit {page_size_bytes}",
                        page.len()
                    );
                }
            }
        }
    }
}

#[test]
fn oversized_value_gets_its_own_page() {
    let descr = ColumnDescriptor::required("blob", PhysicalType::ByteArray);
    let slots: Vec<Slot> = vec![
        Some("small".into()),
        Some(Value::ByteArray(Bytes::from(vec![7u8; 1000]))),
        Some("tail".into()),
    ];
    let limits = PageLimits {
        page_size_bytes: 100,
        page_row_count_limit: 100,
    };

    let mut enc = ColumnPageEncoder::try_new(descr.clone(), &PlainEncoderFactory, limits).unwrap();
    for slot in &slots {
        enc.put(slot.as_ref()).unwrap();
    }
    let (pages, stats) = enc.finish().unwrap();

    let rows: Vec<_> = pages.iter().map(|p| p.num_rows).collect();
    assert_eq!(vec![1, 1, 1], rows);
    assert_eq!(1, stats.oversized_pages);
    assert!(pages[1].len() > 100);
}

#[test]
fn plain_rewrite_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pgcf");
    let first = dir.path().join("first.pgcf");
    let second = dir.path().join("second.pgcf");

    let schema = Schema::try_new([
        ColumnDescriptor::required("flag", PhysicalType::Boolean),
        ColumnDescriptor::optional("score", PhysicalType::Double),
        ColumnDescriptor::optional("count", PhysicalType::Int64),
    ])
    .unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let mut writer = Box::new(PageFileWriter::create(&input, schema.clone()).unwrap());
    for _ in 0..2 {
        let chunks: Vec<_> = schema
            .columns()
            .iter()
            .map(|descr| {
                let slots = random_slots(&mut rng, descr, 700, 0.25);
                ColumnChunk::try_from_slots(descr, slots).unwrap()
            })
            .collect();
        write_row_group(
            writer.as_mut(),
            &DeltaEncoderFactory,
            PageLimits::default(),
            &chunks,
        )
        .unwrap();
    }
    writer.close().unwrap();

    let config = RewriteConfig::new(512, Encoding::Plain);
    rewrite_file(&input, &first, config).unwrap();
    rewrite_file(&first, &second, config).unwrap();

    let first_bytes = std::fs::read(&first).unwrap();
    let second_bytes = std::fs::read(&second).unwrap();
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(decode_file(&input), decode_file(&second));
}

#[test]
fn delta_value_stream_layout() {
    let descr = ColumnDescriptor::required("v", PhysicalType::Int32);
    let slots: Vec<Slot> = [100, 102, 101, 150]
        .into_iter()
        .map(|v| Some(Value::Int32(v)))
        .collect();
    let pages = encode_pages(&descr, &DeltaEncoderFactory, PageLimits::default(), &slots);
    assert_eq!(1, pages.len());

    let values = &pages[0].data[HEADER_LEN..];
    assert_eq!(&[100, 0, 0, 0, 4, 1, 98], values);

    let decoded = ColumnPageDecoder::for_page(&pages[0], &descr)
        .unwrap()
        .read_all()
        .unwrap();
    assert_eq!(slots, decoded);
}

#[test]
fn empty_row_group_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pgcf");
    let output = dir.path().join("output.pgcf");

    let schema = Schema::try_new([ColumnDescriptor::optional("v", PhysicalType::Int32)]).unwrap();
    let mut writer = Box::new(PageFileWriter::create(&input, schema.clone()).unwrap());
    let chunk = ColumnChunk::new(PhysicalType::Int32);
    write_row_group(
        writer.as_mut(),
        &PlainEncoderFactory,
        PageLimits::default(),
        &[chunk],
    )
    .unwrap();
    writer.close().unwrap();

    let summary = rewrite_file(&input, &output, RewriteConfig::new(128, Encoding::Delta)).unwrap();
    assert_eq!(1, summary.row_groups);
    assert_eq!(0, summary.rows);

    let (_, row_groups) = read_all_row_groups(&output);
    assert_eq!(1, row_groups[0].columns[0].len());
    assert!(row_groups[0].columns[0][0].is_empty());
}

#[test]
fn failed_rewrite_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pgcf");
    let output = dir.path().join("output.pgcf");

    let schema = Schema::try_new([ColumnDescriptor::required("v", PhysicalType::Int64)]).unwrap();
    let mut writer = Box::new(PageFileWriter::create(&input, schema.clone()).unwrap());
    let chunk = ColumnChunk::try_from_slots(
        &schema.columns()[0],
        (0..100).map(|v| Some(Value::Int64(v))).collect(),
    )
    .unwrap();
    write_row_group(
        writer.as_mut(),
        &PlainEncoderFactory,
        PageLimits::default(),
        &[chunk],
    )
    .unwrap();
    writer.close().unwrap();

    // Truncate the file in the middle of the row group.
    let bytes = std::fs::read(&input).unwrap();
    std::fs::write(&input, &bytes[..bytes.len() - 20]).unwrap();

    let err = rewrite_file(&input, &output, RewriteConfig::new(64, Encoding::Delta)).unwrap_err();
    assert_eq!(ErrorKind::Data, err.kind());
    assert!(err.to_string().starts_with("row group 0: "), "{err}");
    assert!(!output.exists());

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(1, entries.len(), "temporary files left behind: {entries:?}");
}

#[test]
fn missing_input_is_resource_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = rewrite_file(
        dir.path().join("missing.pgcf"),
        dir.path().join("out.pgcf"),
        RewriteConfig::new(64, Encoding::Plain),
    )
    .unwrap_err();
    assert_eq!(ErrorKind::Resource, err.kind());
    assert!(!dir.path().join("out.pgcf").exists());
}

#[test]
fn zero_page_size_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = rewrite_file(
        dir.path().join("in.pgcf"),
        dir.path().join("out.pgcf"),
        RewriteConfig::new(0, Encoding::Delta),
    )
    .unwrap_err();
    assert_eq!(ErrorKind::Configuration, err.kind());
}

/// Write a page file by hand, one row group holding the given pages for
/// column 0.
fn write_raw_file(path: &Path, schema: &Schema, num_rows: u64, pages: &[&[u8]]) {
    let schema_json = serde_json::to_vec(schema).unwrap();
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&(schema_json.len() as u32).to_le_bytes());
    buf.extend_from_slice(&schema_json);
    buf.push(0x01);
    buf.extend_from_slice(&num_rows.to_le_bytes());
    for page in pages {
        buf.push(0x02);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&(page.len() as u32).to_le_bytes());
        buf.extend_from_slice(page);
    }
    buf.push(0x03);
    buf.push(0x00);
    std::fs::write(path, buf).unwrap();
}

#[test]
fn huge_declared_row_counts_are_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pgcf");
    let output = dir.path().join("output.pgcf");
    let schema = Schema::try_new([ColumnDescriptor::required("v", PhysicalType::Int32)]).unwrap();

    // Plain int32 page header claiming u32::MAX rows with no value bytes.
    let page: &[u8] = &[0, 1, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0];
    let cases: &[(u64, &[&[u8]])] = &[
        (u64::MAX, &[]),
        (u64::MAX, &[page]),
        (u32::MAX as u64, &[page]),
    ];

    for (num_rows, pages) in cases {
        write_raw_file(&input, &schema, *num_rows, pages);

        let config = RewriteConfig::new(4096, Encoding::Plain);
        let err = rewrite_file(&input, &output, config).unwrap_err();
        assert_eq!(ErrorKind::Data, err.kind(), "rows: {num_rows}, err: {err}");
        assert!(!output.exists());
    }
}

#[test]
fn huge_page_row_count_is_corrupt() {
    let data = Bytes::from_static(&[0, 1, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]);
    let page = EncodedPage::try_from_bytes(data).unwrap();
    assert_eq!(u32::MAX as usize, page.num_rows);

    let descr = ColumnDescriptor::required("v", PhysicalType::Int32);
    let err = ColumnPageDecoder::for_page(&page, &descr)
        .and_then(|dec| dec.read_all())
        .unwrap_err();
    assert_eq!(ErrorKind::Data, err.kind());
}
