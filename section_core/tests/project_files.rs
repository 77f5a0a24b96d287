//! Project files survive a save/load cycle and still run.

use std::env::temp_dir;
use std::fs;

use section_core::calculations::CalculationOutput;
use section_core::progress::Silent;
use section_core::{load_project, save_project, save_results, Project};

#[test]
fn example_project_round_trips_and_runs() {
    let path = temp_dir().join(format!("section_core_project_{}.json", std::process::id()));
    let results_path = path.with_extension("results.json");

    let project = Project::example();
    save_project(&project, &path).unwrap();
    let loaded = load_project(&path).unwrap();

    assert_eq!(loaded.materials, project.materials);
    assert_eq!(loaded.sections, project.sections);
    assert_eq!(loaded.items, project.items);
    assert_eq!(loaded.settings, project.settings);

    let (id, _) = loaded.find_item("B1 ultimate").unwrap();
    let from_file = loaded.run_item(&id, &Silent).unwrap();
    let in_memory = project.run_item(&id, &Silent).unwrap();
    assert_eq!(from_file, in_memory);
    assert!(matches!(from_file, CalculationOutput::Ultimate(ref r) if r.state.m_x > 0.0));

    save_results(&[from_file], &results_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&results_path).unwrap()).unwrap();
    assert_eq!(json[0]["label"], "B1 ultimate");

    let _ = fs::remove_file(&path);
    let _ = fs::remove_file(&results_path);
}
