//! Command sequence construction
//!
//! Turns a validated [`Project`] into the ordered scripting statements
//! that build and solve the model. Validation is eager: any physically
//! invalid input fails here, before a single statement reaches the
//! engine, so an invalid project never leaves partial engine-side state.

use crate::command::{Command, CommandSequence};
use crate::error::{EngineError, ErrorKind};
use crate::model::Project;

/// Context tag for all builder failures
const CONTEXT: &str = "sequence construction";

fn invalid(message: impl Into<String>, raw: impl Into<String>) -> EngineError {
    EngineError::new(ErrorKind::Configuration, message, raw, CONTEXT)
}

/// Validate physical preconditions. Split from emission so the checks can
/// be exercised without building command text.
pub fn validate(project: &Project) -> Result<(), EngineError> {
    if project.spudcan.diameter <= 0.0 {
        return Err(invalid(
            "Spudcan diameter must be positive",
            format!("diameter = {}", project.spudcan.diameter),
        ));
    }
    if project.spudcan.cone_angle <= 0.0 || project.spudcan.cone_angle >= 90.0 {
        return Err(invalid(
            "Spudcan cone angle must be strictly between 0 and 90 degrees",
            format!("cone_angle = {}", project.spudcan.cone_angle),
        ));
    }
    if project.materials.is_empty() {
        return Err(invalid("At least one material is required", "materials = []"));
    }
    for material in &project.materials {
        if material.name.trim().is_empty() {
            return Err(invalid(
                "Every material needs an identifying name",
                "material with empty name",
            ));
        }
    }
    if project.layers.is_empty() {
        return Err(invalid("At least one soil layer is required", "layers = []"));
    }
    for (i, layer) in project.layers.iter().enumerate() {
        if layer.thickness <= 0.0 {
            return Err(invalid(
                format!("Layer {} thickness must be positive", i + 1),
                format!("thickness = {}", layer.thickness),
            ));
        }
        if !project.materials.iter().any(|m| m.name == layer.material) {
            return Err(invalid(
                format!("Layer {} references undeclared material '{}'", i + 1, layer.material),
                format!("material = {}", layer.material),
            ));
        }
    }
    if project.control.target_penetration <= 0.0 {
        return Err(invalid(
            "Target penetration must be positive",
            format!("target_penetration = {}", project.control.target_penetration),
        ));
    }
    Ok(())
}

/// Build the full model/calculation sequence for a project.
///
/// Order is load-bearing: materials before stratigraphy before geometry
/// before loading before analysis control before output pre-selection.
/// Reset and title statements are NOT included; the orchestrator prepends
/// them when starting a new engine project.
pub fn build_sequence(project: &Project) -> Result<CommandSequence, EngineError> {
    validate(project)?;

    let mut commands = Vec::new();

    commands.push(Command::comment("material sets"));
    for material in &project.materials {
        commands.push(Command::statement(
            format!("define material {}", material.name),
            format!(
                "material \"{}\" gammasat={} su={} phi={} eref={}",
                material.name,
                material.unit_weight,
                material.cohesion,
                material.friction_angle,
                material.stiffness
            ),
        ));
    }

    commands.push(Command::comment("stratigraphy"));
    commands.push(Command::statement("create borehole", "borehole 0"));
    if project.water_depth > 0.0 {
        commands.push(Command::statement(
            "set water level",
            format!("waterlevel {}", project.water_depth),
        ));
    }
    let mut top = 0.0_f64;
    for layer in &project.layers {
        let bottom = top - layer.thickness;
        commands.push(Command::statement(
            format!("add layer {}", layer.material),
            format!("soillayer {} {} \"{}\"", top, bottom, layer.material),
        ));
        top = bottom;
    }

    commands.push(Command::comment("spudcan geometry"));
    commands.push(Command::statement(
        "create spudcan",
        format!(
            "spudcan diameter={} coneangle={}",
            project.spudcan.diameter, project.spudcan.cone_angle
        ),
    ));

    commands.push(Command::comment("mesh"));
    commands.push(Command::statement("generate mesh", "mesh generate"));

    commands.push(Command::comment("loading"));
    commands.push(Command::statement(
        "apply preload",
        format!("pointload spudcan Fz={}", -project.loading.vertical_preload.abs()),
    ));

    commands.push(Command::comment("analysis control"));
    commands.push(Command::statement(
        "create penetration phase",
        format!(
            "phase penetration target={} maxsteps={} tolerated_error={}",
            project.control.target_penetration,
            project.control.max_steps,
            project.control.tolerated_error
        ),
    ));

    // Pre-select the curve points so the engine records the
    // load-penetration history while it calculates.
    commands.push(Command::comment("output pre-selection"));
    commands.push(Command::statement(
        "select spudcan reference point",
        "selectpoint spudcan_ref",
    ));
    commands.push(Command::statement(
        "register penetration curve",
        "curve spudcan_ref Uz SumFz",
    ));

    Ok(CommandSequence::new(commands))
}

/// The solve stage: issued after the model sequence succeeded. Saving
/// first keeps the project recoverable if the solver dies mid-run.
pub fn calculation_sequence() -> CommandSequence {
    CommandSequence::new(vec![
        Command::statement("save project", "save"),
        Command::statement("run solver", "calculate"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisControl, Layer, Loading, Material, Spudcan};

    fn clay_project() -> Project {
        Project {
            title: "Leg A".to_string(),
            spudcan: Spudcan {
                diameter: 12.0,
                cone_angle: 13.0,
            },
            materials: vec![Material {
                name: "Soft Clay".to_string(),
                unit_weight: 16.0,
                cohesion: 10.0,
                friction_angle: 0.0,
                stiffness: 3000.0,
            }],
            layers: vec![Layer {
                material: "Soft Clay".to_string(),
                thickness: 25.0,
            }],
            loading: Loading {
                vertical_preload: 90_000.0,
            },
            control: AnalysisControl {
                target_penetration: 8.0,
                max_steps: 250,
                tolerated_error: 0.01,
            },
            water_depth: 40.0,
        }
    }

    #[test]
    fn test_valid_project_builds_ordered_sequence() {
        let seq = build_sequence(&clay_project()).unwrap();
        let lines: Vec<String> = seq.iter().map(|c| c.render()).collect();
        let script = lines.join("\n");

        // materials before stratigraphy before geometry before loading
        // before analysis control before output requests
        let order = [
            "material \"Soft Clay\"",
            "borehole 0",
            "soillayer",
            "spudcan diameter=12",
            "mesh generate",
            "pointload",
            "phase penetration",
            "curve spudcan_ref",
        ];
        let mut last = 0;
        for marker in order {
            let pos = script.find(marker).unwrap_or_else(|| panic!("missing {marker}"));
            assert!(pos >= last, "{marker} out of order");
            last = pos;
        }
    }

    #[test]
    fn test_layers_stack_downwards() {
        let mut project = clay_project();
        project.layers.push(Layer {
            material: "Soft Clay".to_string(),
            thickness: 5.0,
        });
        let seq = build_sequence(&project).unwrap();
        let script = seq.to_script();
        assert!(script.contains("soillayer 0 -25"));
        assert!(script.contains("soillayer -25 -30"));
    }

    #[test]
    fn test_preload_is_applied_downwards_regardless_of_sign() {
        let mut project = clay_project();
        project.loading.vertical_preload = -90_000.0;
        let seq = build_sequence(&project).unwrap();
        assert!(seq.to_script().contains("Fz=-90000"));
    }

    #[test]
    fn test_zero_degree_cone_angle_rejected() {
        let mut project = clay_project();
        project.spudcan.cone_angle = 0.0;
        let err = build_sequence(&project).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.context(), "sequence construction");
    }

    #[test]
    fn test_ninety_degree_cone_angle_rejected() {
        let mut project = clay_project();
        project.spudcan.cone_angle = 90.0;
        assert!(build_sequence(&project).is_err());
    }

    #[test]
    fn test_nonpositive_diameter_rejected() {
        let mut project = clay_project();
        project.spudcan.diameter = 0.0;
        assert!(build_sequence(&project).is_err());
    }

    #[test]
    fn test_nonpositive_layer_thickness_rejected() {
        let mut project = clay_project();
        project.layers[0].thickness = -1.0;
        assert!(build_sequence(&project).is_err());
    }

    #[test]
    fn test_unnamed_material_rejected() {
        let mut project = clay_project();
        project.materials[0].name = "  ".to_string();
        assert!(build_sequence(&project).is_err());
    }

    #[test]
    fn test_layer_with_unknown_material_rejected() {
        let mut project = clay_project();
        project.layers[0].material = "Dense Sand".to_string();
        let err = build_sequence(&project).unwrap_err();
        assert!(err.message().contains("Dense Sand"));
    }

    #[test]
    fn test_calculation_sequence_saves_before_solving() {
        let script = calculation_sequence().to_script();
        assert_eq!(script, "save\ncalculate\n");
    }

    #[test]
    fn test_no_water_level_statement_when_dry() {
        let mut project = clay_project();
        project.water_depth = 0.0;
        let seq = build_sequence(&project).unwrap();
        assert!(!seq.to_script().contains("waterlevel"));
    }
}
