use evfilter_algorithms::filter_events;
use evfilter_core::TriggerConfig;
use evfilter_io::{read_clusters, DecisionFormat, DecisionWriter};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_clusters_file_to_decisions_file() {
    let mut input = NamedTempFile::new().unwrap();
    writeln!(input, "key,e,px,py,pz,n_cells,m02,m20,track_dist").unwrap();
    writeln!(input, "10,3.0,0,0,3.0,1,0,0,9").unwrap();
    writeln!(input, "10,0.1,0,0,0.1,1,0,0,9").unwrap();
    writeln!(input, "11,2.5,0,0,2.5,1,0,0,1.0").unwrap();
    writeln!(input, "12,0.1,0,0,0.1,1,0,0,9").unwrap();
    input.flush().unwrap();

    let clusters = read_clusters(input.path()).unwrap();
    let output = NamedTempFile::new().unwrap();
    let mut writer = DecisionWriter::create(output.path(), DecisionFormat::Csv).unwrap();

    let mut write_error = None;
    let statistics = filter_events(clusters, &TriggerConfig::default(), |decision| {
        if let Err(err) = writer.write(&decision) {
            write_error.get_or_insert(err);
        }
    })
    .unwrap();
    assert!(write_error.is_none());
    assert_eq!(writer.finish().unwrap(), 3);
    assert_eq!(statistics.groups, 3);

    let content = std::fs::read_to_string(output.path()).unwrap();
    let rows: Vec<&str> = content.lines().skip(1).collect();
    assert_eq!(rows, vec!["10,1,0,0,0,1", "11,1,1,0,0,1", "12,0,0,0,0,0"]);
}
