use logmelt::decompose::{DecompositionPipeline, Mode, Row};
use logmelt::{ConfigError, RunConfig};
use std::io::Write;

fn rows(pipeline: &DecompositionPipeline, record: &str) -> Vec<Vec<String>> {
    pipeline.process(record).map(Row::into_cells).collect()
}

#[test]
fn envelope_projection_reads_common_fields() {
    let pipeline = DecompositionPipeline::initialize(&["os"], Mode::EnvelopeProjection).unwrap();

    assert_eq!(
        rows(&pipeline, r#"1583612345678|{"cm":{"os":"ios"}}"#),
        vec![vec!["ios", "1583612345678"]]
    );
}

#[test]
fn combined_fans_out_one_row_per_event() {
    let pipeline = DecompositionPipeline::initialize::<&str>(&[], Mode::Combined).unwrap();

    assert_eq!(
        rows(
            &pipeline,
            r#"1583612345678|{"cm":{},"et":[{"en":"click"},{"en":"view"}]}"#
        ),
        vec![
            vec!["1583612345678", "click", r#"{"en":"click"}"#],
            vec!["1583612345678", "view", r#"{"en":"view"}"#],
        ]
    );
}

#[test]
fn bad_timestamp_yields_one_blank_row_in_every_envelope_mode() {
    for (keys, mode) in [
        (vec!["os"], Mode::EnvelopeProjection),
        (vec!["os", "ver"], Mode::Combined),
        (vec![], Mode::Combined),
    ] {
        let pipeline = DecompositionPipeline::initialize(keys.as_slice(), mode).unwrap();
        let out = rows(&pipeline, "badtimestamp|{}");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), pipeline.width());
        assert!(out[0].iter().all(String::is_empty));
    }
}

#[test]
fn combined_empty_event_array_keeps_prefix() {
    let pipeline = DecompositionPipeline::initialize(&["os"], Mode::Combined).unwrap();

    assert_eq!(
        rows(&pipeline, r#"1583612345678|{"cm":{"os":"ios"},"et":[]}"#),
        vec![vec!["ios", "1583612345678", "", ""]]
    );
}

#[test]
fn array_expansion_keeps_malformed_elements() {
    let pipeline = DecompositionPipeline::initialize::<&str>(&[], Mode::ArrayExpansion).unwrap();

    assert_eq!(
        rows(&pipeline, r#"[1,"x",{"en":"e1"}]"#),
        vec![
            vec!["", ""],
            vec!["", ""],
            vec!["e1", r#"{"en":"e1"}"#],
        ]
    );
}

#[test]
fn separator_count_other_than_one_yields_one_blank_row() {
    let pipeline = DecompositionPipeline::initialize(&["os"], Mode::Combined).unwrap();

    for record in [
        "",
        "no separator",
        r#"1583612345678{"cm":{}}"#,
        r#"1583612345678|{"cm":{}}|"#,
        r#"1583612345678||{"cm":{}}"#,
    ] {
        let out = rows(&pipeline, record);
        assert_eq!(out, vec![vec!["", "", "", ""]], "record: {:?}", record);
    }
}

#[test]
fn projected_values_round_trip() {
    let pipeline = DecompositionPipeline::initialize(&["k"], Mode::EnvelopeProjection).unwrap();

    for value in ["plain", "with space", "quote\"inside", "uni\u{00e9}", "back\\slash", ""] {
        let body = serde_json::json!({"cm": {"k": value}});
        let record = format!("1583612345678|{}", body);
        assert_eq!(rows(&pipeline, &record)[0][0], value);
    }
}

#[test]
fn numbers_pass_through_unchanged() {
    let pipeline = DecompositionPipeline::initialize(&["ver", "uid"], Mode::Combined).unwrap();
    let record = concat!(
        r#"1583612345678|{"cm":{"ver":1.10,"uid":18446744073709551616},"#,
        r#""et":[{"en":"pay","amount":19.90,"at":1.5e3}]}"#
    );

    assert_eq!(
        rows(&pipeline, record),
        vec![vec![
            "1.10",
            "18446744073709551616",
            "1583612345678",
            "pay",
            r#"{"en":"pay","amount":19.90,"at":1.5e3}"#,
        ]]
    );
}

#[test]
fn duplicate_column_names_are_a_setup_error() {
    assert!(matches!(
        DecompositionPipeline::initialize(&["os", "server_time"], Mode::Combined),
        Err(ConfigError::DuplicateColumn { .. })
    ));
}

#[test]
fn event_rows_match_array_length() {
    let expansion = DecompositionPipeline::initialize::<&str>(&[], Mode::ArrayExpansion).unwrap();
    let combined = DecompositionPipeline::initialize(&["os"], Mode::Combined).unwrap();

    let elements = [r#"{"en":"a"}"#, "1", "null", "[2]", r#"{"x":1}"#, "\"s\""];
    for n in 0..=elements.len() {
        let array = format!("[{}]", elements[..n].join(","));
        let record = format!(r#"1583612345678|{{"cm":{{"os":"ios"}},"et":{}}}"#, array);

        assert_eq!(expansion.process(&array).count(), n);
        assert_eq!(combined.process(&record).count(), n.max(1));
    }
}

#[test]
fn processing_is_idempotent() {
    let pipeline = DecompositionPipeline::initialize(&["os", "ver"], Mode::Combined).unwrap();
    let record = r#"1583612345678|{"cm":{"os":"ios","ver":"2"},"et":[{"en":"a"},7]}"#;

    let first = rows(&pipeline, record);
    let second = rows(&pipeline, record);
    assert_eq!(first, second);

    let rows_iter = pipeline.process(record);
    let cloned: Vec<Row> = rows_iter.clone().collect();
    assert_eq!(cloned, rows_iter.collect::<Vec<_>>());
}

#[test]
fn permuting_keys_permutes_columns() {
    let forward = DecompositionPipeline::initialize(&["os", "ver"], Mode::Combined).unwrap();
    let swapped = DecompositionPipeline::initialize(&["ver", "os"], Mode::Combined).unwrap();
    let record = r#"1583612345678|{"cm":{"os":"ios","ver":"2"},"et":[{"en":"a"}]}"#;

    let a = rows(&forward, record);
    let b = rows(&swapped, record);
    assert_eq!(a[0][0], b[0][1]);
    assert_eq!(a[0][1], b[0][0]);
    assert_eq!(a[0][2..], b[0][2..]);
}

#[test]
fn width_is_constant_across_rows() {
    let pipeline = DecompositionPipeline::initialize(&["os", "ver"], Mode::Combined).unwrap();

    for record in [
        r#"1583612345678|{"cm":{"os":"ios"},"et":[{"en":"a"},{"en":"b"}]}"#,
        r#"1583612345678|{"cm":{"os":"ios"}}"#,
        r#"1583612345678|{"et":[]}"#,
        "junk",
    ] {
        for row in pipeline.process(record) {
            assert_eq!(row.len(), pipeline.width());
        }
    }
}

#[test]
fn setup_errors_surface_before_processing() {
    assert!(matches!(
        DecompositionPipeline::initialize::<&str>(&[], Mode::EnvelopeProjection),
        Err(ConfigError::TooFewKeys { .. })
    ));
    assert!(matches!(
        DecompositionPipeline::initialize(&["os"], Mode::ArrayExpansion),
        Err(ConfigError::WrongKeyCount { .. })
    ));
}

#[test]
fn config_file_drives_the_pipeline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
mode = "combined"
keys = ["os"]

[filter]
drop_invalid = true
"#
    )
    .unwrap();

    let config = RunConfig::from_file(file.path()).unwrap();
    let pipeline = config.build_pipeline().unwrap();
    let chain = config.build_chain();

    let mut buffer = Vec::new();
    let mut writer =
        logmelt::RowWriter::new(&mut buffer, config.output.format, pipeline.columns());
    let input = "1583612345678|{\"cm\":{\"os\":\"ios\"},\"et\":[{\"en\":\"a\"}]}\nbroken\n";
    let summary =
        logmelt::decompose_lines(input.as_bytes(), &pipeline, &chain, &mut writer).unwrap();

    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.rows, 1);
    assert_eq!(
        String::from_utf8(buffer).unwrap(),
        "ios\t1583612345678\ta\t{\"en\":\"a\"}\n"
    );
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(RunConfig::from_file(dir.path().join("absent.toml")).is_err());
}
