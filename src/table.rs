//! 带属性的几何表

use chrono::NaiveDateTime;
use geo::Geometry;

use crate::{window::Crs, ConversionError, Result};

/// 时间戳列的名称
pub const TIMESTAMP_COLUMN: &str = "TIMESTAMP";

/// 表的列结构；几何列总是存在
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSchema {
    /// 值列的名称；`None`表示没有值列
    pub value_column: Option<String>,
    /// 是否有时间戳列
    pub timestamp: bool,
}

impl TableSchema {
    /// 只有几何列
    pub fn geometry_only() -> Self {
        TableSchema::default()
    }

    pub fn with_value_column(mut self, name: impl Into<String>) -> Self {
        self.value_column = Some(name.into());
        self
    }

    pub fn with_timestamp(mut self) -> Self {
        self.timestamp = true;
        self
    }

    /// 按顺序列出所有列名
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec!["geometry"];
        if let Some(name) = &self.value_column {
            columns.push(name);
        }
        if self.timestamp {
            columns.push(TIMESTAMP_COLUMN);
        }
        columns
    }

    fn accepts(&self, row: &GeometryRow) -> bool {
        self.value_column.is_some() == row.value.is_some()
            && self.timestamp == row.timestamp.is_some()
    }
}

/// 表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRow {
    pub geometry: Geometry<f64>,
    pub value: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
}

impl GeometryRow {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        GeometryRow {
            geometry: geometry.into(),
            value: None,
            timestamp: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// 有序的几何行序列，附带坐标参考系和固定的列结构
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryTable {
    crs: Crs,
    schema: TableSchema,
    rows: Vec<GeometryRow>,
}

impl GeometryTable {
    pub fn new(crs: Crs, schema: TableSchema) -> Self {
        GeometryTable {
            crs,
            schema,
            rows: Vec::new(),
        }
    }

    /// 从一组几何创建只有几何列的表
    pub fn from_geometries<G>(crs: Crs, geometries: impl IntoIterator<Item = G>) -> Self
    where
        G: Into<Geometry<f64>>,
    {
        GeometryTable {
            crs,
            schema: TableSchema::geometry_only(),
            rows: geometries.into_iter().map(GeometryRow::new).collect(),
        }
    }

    /// 追加一行
    ///
    /// # 错误
    /// 行的属性与列结构不符时返回[ConversionError::SchemaMismatch]
    pub fn push(&mut self, row: GeometryRow) -> Result<()> {
        if !self.schema.accepts(&row) {
            return Err(ConversionError::SchemaMismatch);
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[GeometryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeometryRow> {
        self.rows.iter()
    }

    /// 同结构、同坐标参考系的空表
    pub(crate) fn empty_like(&self) -> Self {
        GeometryTable::new(self.crs, self.schema.clone())
    }

    /// 按顺序拼接多张表
    ///
    /// 每张表的坐标参考系必须等于`crs`，列结构必须等于`schema`；
    /// 空表直接跳过，不影响其余行的顺序。
    pub fn concat<I>(crs: Crs, schema: TableSchema, tables: I) -> Result<Self>
    where
        I: IntoIterator<Item = GeometryTable>,
    {
        let mut result = GeometryTable::new(crs, schema);
        for table in tables {
            if table.crs != result.crs {
                return Err(ConversionError::CrsMismatch {
                    expected: result.crs,
                    found: table.crs,
                });
            }
            if table.schema != result.schema {
                return Err(ConversionError::SchemaMismatch);
            }
            if table.is_empty() {
                continue;
            }
            result.rows.extend(table.rows);
        }
        Ok(result)
    }
}

impl<'a> IntoIterator for &'a GeometryTable {
    type Item = &'a GeometryRow;
    type IntoIter = std::slice::Iter<'a, GeometryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
