use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod catalog;
mod parameters;

pub use catalog::{Catalog, CatalogEntry};
pub use parameters::{
    default_parameter_set, validate_definitions, Expr, ParameterError, ParameterResult,
    ParameterSet, ParameterSpec, ParameterType, ParameterValue, Scope,
};

/// Уникальный идентификатор объекта внутри модуля
pub type ObjectId = String;

/// Тип примитива (все примитивы центрированы в начале координат)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    /// Параллелепипед: размеры по X, Y, Z
    Cuboid { size: [Expr; 3] },
    Cylinder {
        radius: Expr,
        height: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segments: Option<u32>,
    },
    Sphere {
        radius: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segments: Option<u32>,
    },
    Cone {
        radius: Expr,
        height: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segments: Option<u32>,
    },
}

/// Тип CSG-операции
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
}

impl BooleanOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanOp::Union => "union",
            BooleanOp::Difference => "difference",
            BooleanOp::Intersection => "intersection",
        }
    }
}

fn zero3() -> [Expr; 3] {
    [Expr::Number(0.0), Expr::Number(0.0), Expr::Number(0.0)]
}

fn one3() -> [Expr; 3] {
    [Expr::Number(1.0), Expr::Number(1.0), Expr::Number(1.0)]
}

fn default_index() -> String {
    "i".to_string()
}

/// Трансформация объекта: масштаб, поворот (градусы), затем перенос
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default = "zero3")]
    pub position: [Expr; 3],
    #[serde(default = "zero3")]
    pub rotation: [Expr; 3],
    #[serde(default = "one3")]
    pub scale: [Expr; 3],
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: zero3(),
            rotation: zero3(),
            scale: one3(),
        }
    }

    /// Только перенос
    pub fn translate(position: [Expr; 3]) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// Операция в программе построения модуля
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DesignOperation {
    /// Создание примитива
    CreatePrimitive {
        id: ObjectId,
        primitive: Primitive,
        #[serde(default)]
        transform: Transform,
    },
    /// CSG-операция: `left op right[0] op right[1] ...`
    Boolean {
        id: ObjectId,
        op: BooleanOp,
        left: ObjectId,
        right: Vec<ObjectId>,
    },
    /// Трансформация ранее созданного объекта (объект поглощается)
    Transform {
        id: ObjectId,
        target: ObjectId,
        transform: Transform,
    },
    /// Объединение `count` копий примитива; индекс доступен в формулах
    Repeat {
        id: ObjectId,
        count: Expr,
        #[serde(default = "default_index")]
        index: String,
        primitive: Primitive,
        #[serde(default)]
        transform: Transform,
    },
}

impl DesignOperation {
    pub fn id(&self) -> &str {
        match self {
            DesignOperation::CreatePrimitive { id, .. }
            | DesignOperation::Boolean { id, .. }
            | DesignOperation::Transform { id, .. }
            | DesignOperation::Repeat { id, .. } => id,
        }
    }
}

/// Документ модуля: содержимое точки входа (`design.jsonc`) без комментариев
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DesignSource {
    /// Определения параметров; отсутствие ключа: нарушение контракта
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterSpec>>,
    /// Производные значения (формулы от параметров)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub derived: BTreeMap<String, Expr>,
    #[serde(default)]
    pub operations: Vec<DesignOperation>,
    /// Итоговый объект; по умолчанию: результат последней операции
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ObjectId>,
}

impl DesignSource {
    /// Идентификатор итогового объекта
    pub fn result_id(&self) -> Option<&str> {
        self.result
            .as_deref()
            .or_else(|| self.operations.last().map(DesignOperation::id))
    }
}
