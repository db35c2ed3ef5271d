//! Design modules backed by a `design.jsonc` document.
//!
//! The document's operations are replayed on the vcad kernel in order, each
//! numeric field evaluated against the parameter scope.

use std::collections::HashMap;

use shared::{
    validate_definitions, BooleanOp, DesignOperation, DesignSource, Expr, ParameterError,
    ParameterSet, ParameterSpec, Primitive, Scope, Transform,
};
use vcad::{centered_cube, centered_cylinder, Part};

use crate::contract::DesignModule;
use crate::error::GenerateError;
use crate::solid::Solid;

pub const DEFAULT_SEGMENTS: u32 = 32;

/// Upper bound on `repeat` counts
const MAX_REPEAT: f64 = 1024.0;

/// A module whose contract is implemented by interpreting its design document.
#[derive(Debug, Clone)]
pub struct ScriptedDesign {
    source: DesignSource,
}

impl ScriptedDesign {
    pub fn new(source: DesignSource) -> Self {
        Self { source }
    }
}

impl DesignModule for ScriptedDesign {
    fn parameter_definitions(&self) -> Result<Vec<ParameterSpec>, ParameterError> {
        let specs = self.source.parameters.clone().unwrap_or_default();
        validate_definitions(&specs)?;
        Ok(specs)
    }

    fn generate(&self, params: &ParameterSet) -> Result<Solid, GenerateError> {
        if self.source.operations.is_empty() {
            return Err(GenerateError::Empty);
        }

        let scope = Scope::with_derived(params, &self.source.derived)?;
        let mut parts: HashMap<String, Part> = HashMap::new();

        for op in &self.source.operations {
            let part = match op {
                DesignOperation::CreatePrimitive {
                    id,
                    primitive,
                    transform,
                } => {
                    let part = create_primitive(id, primitive, &scope)?;
                    apply_transform(id, part, transform, &scope)?
                }
                DesignOperation::Boolean {
                    id,
                    op: bool_op,
                    left,
                    right,
                } => {
                    let left_part = lookup(&parts, left)?;
                    let mut result: Option<Part> = None;
                    for name in right {
                        let right_part = lookup(&parts, name)?;
                        let next = boolean(*bool_op, result.as_ref().unwrap_or(left_part), right_part);
                        result = Some(next);
                    }
                    result.ok_or_else(|| GenerateError::NoOperands(id.clone()))?
                }
                DesignOperation::Transform {
                    id,
                    target,
                    transform,
                } => {
                    let part = parts
                        .remove(target)
                        .ok_or_else(|| GenerateError::UnknownObject(target.clone()))?;
                    apply_transform(id, part, transform, &scope)?
                }
                DesignOperation::Repeat {
                    id,
                    count,
                    index,
                    primitive,
                    transform,
                } => {
                    if params.contains_key(index) || self.source.derived.contains_key(index) {
                        return Err(ParameterError::Shadowed(index.clone()).into());
                    }
                    let count = repeat_count(id, count, &scope)?;
                    // Index is visible only inside this repeat
                    let mut instance_scope = scope.clone();
                    let mut result: Option<Part> = None;
                    for i in 0..count {
                        instance_scope.bind(index, i as f64)?;
                        let instance_id = format!("{}_{}", id, i);
                        let part = create_primitive(&instance_id, primitive, &instance_scope)?;
                        let part =
                            apply_transform(&instance_id, part, transform, &instance_scope)?;
                        result = Some(match result {
                            Some(acc) => acc.union(&part),
                            None => part,
                        });
                    }
                    result.ok_or_else(|| GenerateError::InvalidCount {
                        object: id.clone(),
                        value: 0.0,
                    })?
                }
            };

            if parts.insert(op.id().to_string(), part).is_some() {
                return Err(GenerateError::DuplicateObject(op.id().to_string()));
            }
        }

        let result_id = self.source.result_id().ok_or(GenerateError::Empty)?;
        let part = parts
            .remove(result_id)
            .ok_or_else(|| GenerateError::UnknownObject(result_id.to_string()))?;

        Ok(Solid::new(part))
    }
}

fn lookup<'a>(parts: &'a HashMap<String, Part>, id: &str) -> Result<&'a Part, GenerateError> {
    parts
        .get(id)
        .ok_or_else(|| GenerateError::UnknownObject(id.to_string()))
}

fn boolean(op: BooleanOp, left: &Part, right: &Part) -> Part {
    match op {
        BooleanOp::Union => left.union(right),
        BooleanOp::Difference => left.difference(right),
        BooleanOp::Intersection => left.intersection(right),
    }
}

/// Evaluate a dimension that must be strictly positive.
fn dimension(
    scope: &Scope,
    object: &str,
    field: &'static str,
    expr: &Expr,
) -> Result<f64, GenerateError> {
    let value = scope.eval(expr)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GenerateError::InvalidDimension {
            object: object.to_string(),
            field,
            value,
        })
    }
}

fn finite(
    scope: &Scope,
    object: &str,
    field: &'static str,
    expr: &Expr,
) -> Result<f64, GenerateError> {
    let value = scope.eval(expr)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GenerateError::NonFinite {
            object: object.to_string(),
            field,
            value,
        })
    }
}

fn segments(object: &str, segments: Option<u32>) -> Result<u32, GenerateError> {
    match segments {
        None => Ok(DEFAULT_SEGMENTS),
        Some(n) if n >= 3 => Ok(n),
        Some(n) => Err(GenerateError::InvalidDimension {
            object: object.to_string(),
            field: "segments",
            value: f64::from(n),
        }),
    }
}

fn repeat_count(object: &str, count: &Expr, scope: &Scope) -> Result<i64, GenerateError> {
    let value = scope.eval(count)?;
    if value.is_finite() && value >= 1.0 && value <= MAX_REPEAT && value.fract() == 0.0 {
        Ok(value as i64)
    } else {
        Err(GenerateError::InvalidCount {
            object: object.to_string(),
            value,
        })
    }
}

/// Create a vcad Part from a primitive, centered on the origin
fn create_primitive(id: &str, primitive: &Primitive, scope: &Scope) -> Result<Part, GenerateError> {
    let part = match primitive {
        Primitive::Cuboid { size } => centered_cube(
            id,
            dimension(scope, id, "size.x", &size[0])?,
            dimension(scope, id, "size.y", &size[1])?,
            dimension(scope, id, "size.z", &size[2])?,
        ),
        Primitive::Cylinder {
            radius,
            height,
            segments: n,
        } => centered_cylinder(
            id,
            dimension(scope, id, "radius", radius)?,
            dimension(scope, id, "height", height)?,
            segments(id, *n)?,
        ),
        Primitive::Sphere { radius, segments: n } => {
            Part::sphere(id, dimension(scope, id, "radius", radius)?, segments(id, *n)?)
        }
        Primitive::Cone {
            radius,
            height,
            segments: n,
        } => Part::cone(
            id,
            dimension(scope, id, "radius", radius)?,
            0.0,
            dimension(scope, id, "height", height)?,
            segments(id, *n)?,
        ),
    };
    Ok(part)
}

/// Apply scale, rotation (degrees) and translation, skipping identity components
fn apply_transform(
    id: &str,
    part: Part,
    transform: &Transform,
    scope: &Scope,
) -> Result<Part, GenerateError> {
    let [sx, sy, sz] = [
        dimension(scope, id, "scale.x", &transform.scale[0])?,
        dimension(scope, id, "scale.y", &transform.scale[1])?,
        dimension(scope, id, "scale.z", &transform.scale[2])?,
    ];
    let [rx, ry, rz] = [
        finite(scope, id, "rotation.x", &transform.rotation[0])?,
        finite(scope, id, "rotation.y", &transform.rotation[1])?,
        finite(scope, id, "rotation.z", &transform.rotation[2])?,
    ];
    let [tx, ty, tz] = [
        finite(scope, id, "position.x", &transform.position[0])?,
        finite(scope, id, "position.y", &transform.position[1])?,
        finite(scope, id, "position.z", &transform.position[2])?,
    ];

    let mut p = part;
    if sx != 1.0 || sy != 1.0 || sz != 1.0 {
        p = p.scale(sx, sy, sz);
    }
    if rx != 0.0 || ry != 0.0 || rz != 0.0 {
        p = p.rotate(rx, ry, rz);
    }
    if tx != 0.0 || ty != 0.0 || tz != 0.0 {
        p = p.translate(tx, ty, tz);
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::default_parameter_set;

    fn design(json: &str) -> ScriptedDesign {
        ScriptedDesign::new(serde_json::from_str(json).expect("design json"))
    }

    fn build(design: &ScriptedDesign) -> Result<Solid, GenerateError> {
        let specs = design.parameter_definitions().expect("valid parameters");
        design.generate(&default_parameter_set(&specs))
    }

    const SCALED_CUBE: &str = r#"{
        "parameters": [ { "name": "size", "type": "number", "initial": 10, "min": 1, "max": 50 } ],
        "operations": [
            { "type": "create_primitive", "id": "cube",
              "primitive": { "type": "cuboid", "size": [1, 1, 1] },
              "transform": { "scale": ["size", "size", "size"] } }
        ]
    }"#;

    #[test]
    fn test_scaled_cube_bounds() {
        let solid = build(&design(SCALED_CUBE)).unwrap();
        let size = solid.mesh().unwrap().size();
        for axis in [size.x, size.y, size.z] {
            assert!((axis - 10.0).abs() < 1e-3, "size {:?}", size);
        }
    }

    #[test]
    fn test_difference_removes_volume() {
        let d = design(
            r#"{
            "parameters": [],
            "operations": [
                { "type": "create_primitive", "id": "outer", "primitive": { "type": "cuboid", "size": [10, 10, 10] } },
                { "type": "create_primitive", "id": "inner", "primitive": { "type": "cuboid", "size": [5, 5, 20] } },
                { "type": "boolean", "id": "tube", "op": "difference", "left": "outer", "right": ["inner"] }
            ]
        }"#,
        );
        let mesh = build(&d).unwrap().mesh().unwrap();
        assert!((mesh.volume() - 750.0).abs() < 1.0, "volume {}", mesh.volume());
    }

    #[test]
    fn test_repeat_binds_index() {
        let d = design(
            r#"{
            "parameters": [ { "name": "cells", "type": "int", "initial": 3 } ],
            "derived": { "pitch": 4 },
            "operations": [
                { "type": "repeat", "id": "row", "count": "cells",
                  "primitive": { "type": "cuboid", "size": [2, 2, 2] },
                  "transform": { "position": ["i * pitch", 0, 0] } }
            ]
        }"#,
        );
        let size = build(&d).unwrap().mesh().unwrap().size();
        assert!((size.x - 10.0).abs() < 1e-3, "size {:?}", size);
        assert!((size.y - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_operations() {
        let d = design(r#"{ "parameters": [] }"#);
        assert!(matches!(build(&d), Err(GenerateError::Empty)));
    }

    #[test]
    fn test_unknown_operand() {
        let d = design(
            r#"{ "parameters": [], "operations": [
                { "type": "create_primitive", "id": "a", "primitive": { "type": "sphere", "radius": 1 } },
                { "type": "boolean", "id": "b", "op": "union", "left": "a", "right": ["ghost"] } ] }"#,
        );
        assert!(matches!(build(&d), Err(GenerateError::UnknownObject(ref id)) if id == "ghost"));
    }

    #[test]
    fn test_unknown_result() {
        let d = design(
            r#"{ "parameters": [], "result": "nope", "operations": [
                { "type": "create_primitive", "id": "a", "primitive": { "type": "sphere", "radius": 1 } } ] }"#,
        );
        assert!(matches!(build(&d), Err(GenerateError::UnknownObject(_))));
    }

    #[test]
    fn test_negative_dimension() {
        let d = design(
            r#"{ "parameters": [ { "name": "w", "type": "number", "initial": 2 } ], "operations": [
                { "type": "create_primitive", "id": "a", "primitive": { "type": "cuboid", "size": ["w - 5", 1, 1] } } ] }"#,
        );
        assert!(matches!(
            build(&d),
            Err(GenerateError::InvalidDimension { field: "size.x", .. })
        ));
    }

    #[test]
    fn test_duplicate_object_id() {
        let d = design(
            r#"{ "parameters": [], "operations": [
                { "type": "create_primitive", "id": "a", "primitive": { "type": "sphere", "radius": 1 } },
                { "type": "create_primitive", "id": "a", "primitive": { "type": "sphere", "radius": 2 } } ] }"#,
        );
        assert!(matches!(build(&d), Err(GenerateError::DuplicateObject(_))));
    }

    #[test]
    fn test_fractional_repeat_count() {
        let d = design(
            r#"{ "parameters": [], "operations": [
                { "type": "repeat", "id": "r", "count": 2.5,
                  "primitive": { "type": "sphere", "radius": 1 } } ] }"#,
        );
        assert!(matches!(build(&d), Err(GenerateError::InvalidCount { .. })));
    }

    #[test]
    fn test_formula_error_surfaces_as_parameter_error() {
        let d = design(
            r#"{ "parameters": [], "operations": [
                { "type": "create_primitive", "id": "a", "primitive": { "type": "sphere", "radius": "undefined_name" } } ] }"#,
        );
        assert!(matches!(build(&d), Err(GenerateError::Parameter(_))));
    }

    #[test]
    fn test_parameter_definitions_validated() {
        let d = design(
            r#"{ "parameters": [ { "name": "w", "type": "number", "initial": 200, "max": 100 } ], "operations": [] }"#,
        );
        assert!(matches!(
            d.parameter_definitions(),
            Err(ParameterError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_repeat_index_is_scoped_to_its_operation() {
        let d = design(
            r#"{ "parameters": [], "operations": [
                { "type": "repeat", "id": "row", "count": 2,
                  "primitive": { "type": "cuboid", "size": [1, 1, 1] },
                  "transform": { "position": ["i * 3", 0, 0] } },
                { "type": "create_primitive", "id": "after",
                  "primitive": { "type": "cuboid", "size": ["i + 1", 1, 1] } } ] }"#,
        );
        assert!(matches!(build(&d), Err(GenerateError::Parameter(_))));
    }

    #[test]
    fn test_integer_literals_and_index_divide_as_floats() {
        let d = design(
            r#"{ "parameters": [], "operations": [
                { "type": "create_primitive", "id": "half",
                  "primitive": { "type": "cuboid", "size": ["1 / 2 * 10", "3 / 2", 1] } },
                { "type": "repeat", "id": "row", "count": 2,
                  "primitive": { "type": "cuboid", "size": [1, 1, 1] },
                  "transform": { "position": [0, 0, "i / 2 * 4 + 10"] } },
                { "type": "boolean", "id": "all", "op": "union", "left": "half", "right": ["row"] } ] }"#,
        );
        let size = build(&d).unwrap().mesh().unwrap().size();
        assert!((size.x - 5.0).abs() < 1e-3, "size {:?}", size);
        assert!((size.y - 1.5).abs() < 1e-3, "size {:?}", size);
        // Row cubes centered at z = 10 and z = 12
        assert!((size.z - 13.0).abs() < 1e-3, "size {:?}", size);
    }
}
