// End-to-end passes over throwaway design trees: build isolation, catalog
// completeness and idempotence, artifact URLs and the shipped sample designs.
mod support;

use anyhow::Result;
use design_pipeline::error::PipelineError;
use design_pipeline::report::Phase;
use design_pipeline::{PipelineConfig, RunStatus};
use shared::ParameterValue;
use std::fs;
use support::{assert_close, cube_module, repo_root, stl_bounds, Project, FAILING_MODULE};

#[test]
fn failing_module_does_not_block_others() -> Result<()> {
    let project = Project::new()?;
    project.add_module("alpha", &cube_module(4.0))?;
    project.add_module("broken", FAILING_MODULE)?;
    project.add_module("zeta", &cube_module(6.0))?;

    let report = project.pipeline().build()?;
    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert_eq!(report.status().exit_code(), 1);
    assert_eq!(report.succeeded, vec!["alpha", "zeta"]);
    assert_eq!(report.failed_ids(), vec!["broken"]);
    assert_eq!(report.failures[0].phase, Phase::Generate);

    for id in ["alpha", "zeta"] {
        assert!(project.config.artifact_path(id).is_file());
        assert!(project.config.viewer_models_dir.join(format!("{id}.stl")).is_file());
    }
    assert!(!project.config.artifact_path("broken").exists());
    Ok(())
}

#[test]
fn catalog_lists_exactly_the_valid_modules() -> Result<()> {
    let project = Project::new()?;
    project.add_module("good", &cube_module(10.0))?;
    project.add_module("no-params", r#"{ "operations": [] }"#)?;
    project.add_module("garbage", "this is not json")?;
    project.add_module(
        "out-of-range",
        r#"{ "parameters": [ { "name": "w", "type": "number", "initial": 500, "min": 1, "max": 100 } ] }"#,
    )?;
    project.add_module("utils/helper", &cube_module(1.0))?;
    project.add_module("nested/inner", &cube_module(2.0))?;

    let report = project.pipeline().catalog()?;
    assert_eq!(report.discovered, 5);
    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert_eq!(project.catalog_ids()?, vec!["good", "inner"]);

    let mut rejected = report.failed_ids();
    rejected.sort_unstable();
    assert_eq!(rejected, vec!["garbage", "no-params", "out-of-range"]);
    assert!(report.failures.iter().all(|f| f.phase == Phase::Load));
    Ok(())
}

#[test]
fn catalog_is_idempotent() -> Result<()> {
    let project = Project::new()?;
    project.add_module("demo-box", &cube_module(12.0))?;
    project.add_module("plain", &cube_module(3.0))?;
    project.pipeline().build()?;

    project.pipeline().catalog()?;
    let first = fs::read(&project.config.catalog_path)?;
    let readme_first = fs::read_to_string(project.config.design_root.join("demo-box/README.md"))?;

    project.pipeline().catalog()?;
    assert_eq!(fs::read(&project.config.catalog_path)?, first);
    assert_eq!(
        fs::read_to_string(project.config.design_root.join("demo-box/README.md"))?,
        readme_first
    );
    assert!(readme_first.contains("[Download STL](../../dist/demo-box.stl)"));
    Ok(())
}

#[test]
fn stl_url_resolves_to_viewer_artifact() -> Result<()> {
    let project = Project::new()?;
    project.add_module("holder", &cube_module(8.0))?;
    project.add_module("group/bracket", &cube_module(5.0))?;

    project.pipeline().build()?;
    project.pipeline().catalog()?;

    for entry in project.read_catalog()? {
        let file = entry
            .stl_url
            .strip_prefix("/models/")
            .expect("url under the models prefix");
        assert_eq!(file, format!("{}.stl", entry.id));
        let served = project.config.viewer_models_dir.join(file);
        assert!(served.is_file(), "{} missing", served.display());
        assert_eq!(fs::read(&served)?, fs::read(project.config.artifact_path(&entry.id))?);
    }
    Ok(())
}

#[test]
fn cube_of_size_ten() -> Result<()> {
    let project = Project::new()?;
    project.add_module("examples-cube", &cube_module(10.0))?;

    let report = project.pipeline().build()?;
    assert_eq!(report.status(), RunStatus::Success);
    project.pipeline().catalog()?;

    let (min, max) = stl_bounds(&project.config.artifact_path("examples-cube"))?;
    for axis in 0..3 {
        assert_close(max[axis] - min[axis], 10.0);
    }

    let catalog = project.read_catalog()?;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].title, "Examples Cube");
    assert_eq!(catalog[0].description, "Cube with edge 10");
    assert_eq!(catalog[0].parameters[0].initial, ParameterValue::Number(10.0));

    let inspection = project.pipeline().inspect("examples-cube")?;
    assert!((inspection.volume - 1000.0).abs() < 1e-2);
    assert_close(inspection.size[2], 10.0);
    Ok(())
}

#[test]
fn directory_without_entry_point_is_skipped() -> Result<()> {
    let project = Project::new()?;
    project.add_module("real", &cube_module(2.0))?;
    fs::create_dir_all(project.config.design_root.join("sketches"))?;
    fs::write(project.config.design_root.join("sketches/notes.txt"), "todo")?;

    let report = project.pipeline().build()?;
    assert_eq!(report.discovered, 1);
    assert_eq!(report.status(), RunStatus::Success);
    Ok(())
}

#[test]
fn deleted_module_leaves_the_catalog() -> Result<()> {
    let project = Project::new()?;
    let gone = project.add_module("gone", &cube_module(2.0))?;
    project.add_module("kept", &cube_module(2.0))?;

    project.pipeline().catalog()?;
    assert_eq!(project.catalog_ids()?, vec!["gone", "kept"]);

    fs::remove_dir_all(gone)?;
    project.pipeline().catalog()?;
    assert_eq!(project.catalog_ids()?, vec!["kept"]);
    Ok(())
}

#[test]
fn empty_tree_is_not_a_failure() -> Result<()> {
    let project = Project::new()?;
    let report = project.pipeline().catalog()?;
    assert_eq!(report.status(), RunStatus::NoModules);
    assert_eq!(report.status().exit_code(), 0);
    assert!(project.read_catalog()?.is_empty());
    Ok(())
}

#[test]
fn missing_design_root_is_fatal() -> Result<()> {
    let project = Project::new()?;
    fs::remove_dir_all(&project.config.design_root)?;
    assert!(matches!(
        project.pipeline().build(),
        Err(PipelineError::MissingRoot(_))
    ));
    Ok(())
}

#[test]
fn catalog_write_failure_is_fatal_and_keeps_old_catalog() -> Result<()> {
    let mut project = Project::new()?;
    project.add_module("a", &cube_module(2.0))?;
    project.pipeline().catalog()?;
    let before = fs::read(&project.config.catalog_path)?;

    // Point the catalog at a directory so the final rename fails
    let blocked = project.dir.path().join("blocked");
    fs::create_dir_all(blocked.join("inside"))?;
    let original = project.config.catalog_path.clone();
    project.config.catalog_path = blocked;
    assert!(matches!(
        project.pipeline().catalog(),
        Err(PipelineError::CatalogWrite { .. })
    ));
    assert_eq!(fs::read(original)?, before);
    Ok(())
}

#[test]
fn check_writes_nothing() -> Result<()> {
    let project = Project::new()?;
    project.add_module("a", &cube_module(2.0))?;
    project.add_module("b", r#"{ "operations": [] }"#)?;

    let report = project.pipeline().check()?;
    assert_eq!(report.succeeded, vec!["a"]);
    assert_eq!(report.failed_ids(), vec!["b"]);
    assert!(!project.config.dist_dir.exists());
    assert!(!project.config.catalog_path.exists());
    assert!(!project.config.design_root.join("a/README.md").exists());
    Ok(())
}

#[test]
fn inspect_unknown_module() -> Result<()> {
    let project = Project::new()?;
    project.add_module("a", &cube_module(2.0))?;
    assert!(matches!(
        project.pipeline().inspect("nope"),
        Err(PipelineError::UnknownModule(_))
    ));
    Ok(())
}

#[test]
fn shipped_designs_build() -> Result<()> {
    let out = tempfile::tempdir()?;
    let repo = repo_root();
    let mut config = PipelineConfig::default().anchored(out.path());
    config.design_root = repo.join("design");

    let pipeline = design_pipeline::Pipeline::new(config.clone());
    let report = pipeline.build()?;
    assert_eq!(report.status(), RunStatus::Success, "{:?}", report.failures);
    assert_eq!(report.succeeded, vec!["battery-holder", "demo-box"]);

    let (min, max) = stl_bounds(&config.artifact_path("demo-box"))?;
    assert_close(max[0] - min[0], 50.0);
    assert_close(max[1] - min[1], 50.0);
    assert_close(max[2] - min[2], 30.0);

    // 2 cells: 2 * (18.4 + 2.5) + 2.5 wide, 18.4 + 5 deep, 3 + 66 * 0.7 tall
    let (min, max) = stl_bounds(&config.artifact_path("battery-holder"))?;
    assert_close(max[0] - min[0], 44.3);
    assert_close(max[1] - min[1], 23.4);
    assert_close(max[2] - min[2], 49.2);
    Ok(())
}
