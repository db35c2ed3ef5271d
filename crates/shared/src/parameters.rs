use evalexpr::{build_operator_tree, ContextWithMutableVariables, HashMapContext, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Результат вычисления выражения
pub type ParameterResult = Result<f64, ParameterError>;

/// Набор значений параметров: имя -> значение
pub type ParameterSet = BTreeMap<String, ParameterValue>;

/// Ошибки при работе с параметрами
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// Параметр не найден
    NotFound(String),
    /// Ошибка парсинга формулы
    ParseError(String),
    /// Ошибка вычисления формулы
    EvaluationError(String),
    /// Циклическая зависимость
    CircularDependency(Vec<String>),
    /// Неверный тип значения
    InvalidType(String),
    /// Пустое имя параметра
    EmptyName,
    /// Имя параметра повторяется в одном модуле
    DuplicateName(String),
    /// Начальное значение вне объявленных границ
    OutOfBounds {
        name: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// min > max
    InvalidBounds { name: String, min: f64, max: f64 },
    /// Шаг должен быть положительным
    InvalidStep { name: String, step: f64 },
    /// Границы или шаг объявлены у текстового параметра
    BoundsOnText(String),
    /// Производное значение перекрывает параметр
    Shadowed(String),
}

impl std::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterError::NotFound(name) => write!(f, "Parameter '{}' not found", name),
            ParameterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ParameterError::EvaluationError(msg) => write!(f, "Evaluation error: {}", msg),
            ParameterError::CircularDependency(chain) => {
                write!(f, "Circular dependency: {}", chain.join(" -> "))
            }
            ParameterError::InvalidType(msg) => write!(f, "Invalid type: {}", msg),
            ParameterError::EmptyName => write!(f, "Parameter name must not be empty"),
            ParameterError::DuplicateName(name) => {
                write!(f, "Parameter '{}' is declared more than once", name)
            }
            ParameterError::OutOfBounds {
                name,
                value,
                min,
                max,
            } => {
                let lo = min.map(|v| v.to_string()).unwrap_or_else(|| "-inf".into());
                let hi = max.map(|v| v.to_string()).unwrap_or_else(|| "+inf".into());
                write!(
                    f,
                    "Parameter '{}': initial value {} outside [{}, {}]",
                    name, value, lo, hi
                )
            }
            ParameterError::InvalidBounds { name, min, max } => {
                write!(f, "Parameter '{}': min {} is greater than max {}", name, min, max)
            }
            ParameterError::InvalidStep { name, step } => {
                write!(f, "Parameter '{}': step {} must be positive", name, step)
            }
            ParameterError::BoundsOnText(name) => {
                write!(f, "Parameter '{}': text parameters cannot declare min/max/step", name)
            }
            ParameterError::Shadowed(name) => {
                write!(f, "Derived value '{}' shadows a parameter of the same name", name)
            }
        }
    }
}

impl std::error::Error for ParameterError {}

/// Тип параметра
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Number,
    Int,
    Text,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::Number => "number",
            ParameterType::Int => "int",
            ParameterType::Text => "text",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ParameterType::Text)
    }
}

/// Значение параметра: число или текст
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(v) => Some(*v),
            ParameterValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Number(v) => write!(f, "{}", v),
            ParameterValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Описание одного настраиваемого параметра модуля
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub initial: ParameterValue,
    /// Подпись для человека
    #[serde(default)]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl ParameterSpec {
    /// Числовой параметр без границ
    pub fn number(name: &str, initial: f64, caption: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParameterType::Number,
            initial: ParameterValue::Number(initial),
            caption: caption.to_string(),
            min: None,
            max: None,
            step: None,
        }
    }

    /// Задать границы (builder)
    pub fn bounded(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Проверить согласованность описания параметра
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.name.trim().is_empty() {
            return Err(ParameterError::EmptyName);
        }

        match (self.kind, &self.initial) {
            (ParameterType::Text, ParameterValue::Text(_)) => {
                if self.min.is_some() || self.max.is_some() || self.step.is_some() {
                    return Err(ParameterError::BoundsOnText(self.name.clone()));
                }
                Ok(())
            }
            (ParameterType::Text, ParameterValue::Number(_)) => Err(ParameterError::InvalidType(
                format!("parameter '{}' is text but its initial value is a number", self.name),
            )),
            (_, ParameterValue::Text(_)) => Err(ParameterError::InvalidType(format!(
                "parameter '{}' is {} but its initial value is text",
                self.name,
                self.kind.as_str()
            ))),
            (kind, ParameterValue::Number(value)) => {
                let value = *value;
                if !value.is_finite() {
                    return Err(ParameterError::InvalidType(format!(
                        "parameter '{}' has a non-finite initial value",
                        self.name
                    )));
                }
                if kind == ParameterType::Int && value.fract() != 0.0 {
                    return Err(ParameterError::InvalidType(format!(
                        "parameter '{}' is int but its initial value is {}",
                        self.name, value
                    )));
                }
                if let (Some(min), Some(max)) = (self.min, self.max) {
                    if min > max {
                        return Err(ParameterError::InvalidBounds {
                            name: self.name.clone(),
                            min,
                            max,
                        });
                    }
                }
                if let Some(step) = self.step {
                    if step <= 0.0 || step.is_nan() {
                        return Err(ParameterError::InvalidStep {
                            name: self.name.clone(),
                            step,
                        });
                    }
                }
                let below = self.min.is_some_and(|min| value < min);
                let above = self.max.is_some_and(|max| value > max);
                if below || above {
                    return Err(ParameterError::OutOfBounds {
                        name: self.name.clone(),
                        value,
                        min: self.min,
                        max: self.max,
                    });
                }
                Ok(())
            }
        }
    }
}

/// Проверить список определений: каждое описание корректно, имена уникальны
pub fn validate_definitions(specs: &[ParameterSpec]) -> Result<(), ParameterError> {
    let mut seen = HashSet::new();
    for spec in specs {
        spec.validate()?;
        if !seen.insert(spec.name.as_str()) {
            return Err(ParameterError::DuplicateName(spec.name.clone()));
        }
    }
    Ok(())
}

/// Набор параметров по умолчанию: ровно `initial` каждого объявленного параметра
pub fn default_parameter_set(specs: &[ParameterSpec]) -> ParameterSet {
    specs
        .iter()
        .map(|spec| (spec.name.clone(), spec.initial.clone()))
        .collect()
}

/// Числовое выражение: литерал или формула evalexpr
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Number(f64),
    Formula(String),
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Number(value)
    }
}

impl From<&str> for Expr {
    fn from(formula: &str) -> Self {
        Expr::Formula(formula.to_string())
    }
}

/// Контекст вычисления формул: параметры, производные значения и константы
#[derive(Clone)]
pub struct Scope {
    context: HashMapContext,
}

impl Scope {
    /// Создать контекст из набора параметров
    pub fn new(params: &ParameterSet) -> Result<Self, ParameterError> {
        let mut context = HashMapContext::new();

        for (name, value) in params {
            let value = match value {
                ParameterValue::Number(v) => Value::Float(*v),
                ParameterValue::Text(s) => Value::String(s.clone()),
            };
            context
                .set_value(name.clone(), value)
                .map_err(|e| ParameterError::EvaluationError(e.to_string()))?;
        }

        // Добавить математические константы
        context
            .set_value("PI".to_string(), Value::Float(std::f64::consts::PI))
            .ok();
        context
            .set_value("E".to_string(), Value::Float(std::f64::consts::E))
            .ok();

        Ok(Self { context })
    }

    /// Создать контекст и вычислить производные значения (с проверкой циклов)
    pub fn with_derived(
        params: &ParameterSet,
        derived: &BTreeMap<String, Expr>,
    ) -> Result<Self, ParameterError> {
        if let Some(name) = derived.keys().find(|name| params.contains_key(*name)) {
            return Err(ParameterError::Shadowed(name.clone()));
        }

        let mut scope = Self::new(params)?;
        let mut resolved = HashMap::new();
        for name in derived.keys() {
            let mut path = Vec::new();
            scope.resolve_derived(name, derived, &mut resolved, &mut path)?;
        }
        Ok(scope)
    }

    /// Внутренняя рекурсивная функция для вычисления производного значения
    fn resolve_derived(
        &mut self,
        name: &str,
        derived: &BTreeMap<String, Expr>,
        resolved: &mut HashMap<String, f64>,
        path: &mut Vec<String>,
    ) -> ParameterResult {
        if let Some(value) = resolved.get(name) {
            return Ok(*value);
        }

        // Проверка на циклическую зависимость
        if path.iter().any(|p| p == name) {
            path.push(name.to_string());
            return Err(ParameterError::CircularDependency(path.clone()));
        }

        let expr = derived
            .get(name)
            .ok_or_else(|| ParameterError::NotFound(name.to_string()))?;

        path.push(name.to_string());

        if let Expr::Formula(formula) = expr {
            let tree = build_operator_tree(formula)
                .map_err(|e| ParameterError::ParseError(format!("{}: {}", name, e)))?;
            let deps: Vec<String> = tree
                .iter_variable_identifiers()
                .filter(|dep| derived.contains_key(*dep) && !resolved.contains_key(*dep))
                .map(str::to_string)
                .collect();
            for dep in deps {
                self.resolve_derived(&dep, derived, resolved, path)?;
            }
        }

        let value = self.eval(expr)?;
        self.context
            .set_value(name.to_string(), Value::Float(value))
            .map_err(|e| ParameterError::EvaluationError(e.to_string()))?;
        resolved.insert(name.to_string(), value);
        path.pop();

        Ok(value)
    }

    /// Привязать числовую переменную (например, индекс цикла)
    pub fn bind(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        self.context
            .set_value(name.to_string(), Value::Float(value))
            .map_err(|e| ParameterError::EvaluationError(e.to_string()))
    }

    /// Вычислить выражение в этом контексте
    pub fn eval(&self, expr: &Expr) -> ParameterResult {
        let formula = match expr {
            Expr::Number(value) => return Ok(*value),
            Expr::Formula(formula) => formula,
        };

        let tree = build_operator_tree(&float_literals(formula))
            .map_err(|e| ParameterError::ParseError(format!("'{}': {}", formula, e)))?;

        let value = tree
            .eval_with_context(&self.context)
            .map_err(|e| ParameterError::EvaluationError(format!("'{}': {}", formula, e)))?;

        // Преобразовать в f64
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            _ => Err(ParameterError::InvalidType(format!(
                "'{}' evaluated to {:?}, expected a number",
                formula, value
            ))),
        }
    }
}

/// Переписать целые литералы как дробные (`3` -> `3.0`).
///
/// evalexpr делит целое на целое нацело; все формулы считаются в f64.
fn float_literals(formula: &str) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 1;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
            continue;
        }

        let glued = i > 0 && (chars[i - 1].is_alphanumeric() || chars[i - 1] == '_' || chars[i - 1] == '.');
        if c.is_ascii_digit() && !glued {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            out.push_str(&token);
            if token.chars().all(|d| d.is_ascii_digit()) {
                out.push_str(".0");
            }
            continue;
        }

        out.push(c);
        i += 1;
    }
    out
}
