use serde::{Deserialize, Serialize};

use crate::ParameterSpec;

/// Запись каталога: всё, что просмотрщику нужно знать о модуле
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Идентификатор модуля (имя каталога)
    pub id: String,
    pub title: String,
    pub description: String,
    /// Адрес STL-файла, видимый просмотрщику
    pub stl_url: String,
    pub parameters: Vec<ParameterSpec>,
    /// Время изменения исходного файла, RFC 3339
    pub last_update: String,
    /// Сгенерированный README модуля
    pub readme_content: String,
}

/// Каталог: упорядоченная последовательность записей
pub type Catalog = Vec<CatalogEntry>;
