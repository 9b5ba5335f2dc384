use crate::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub table: String,
    /// Typed NULL describing the column type.
    pub value: Value,
    pub nullable: bool,
}

/// Description of the rows a statement produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSetMetadata {
    pub columns: Vec<ColumnMetadata>,
}

impl ResultSetMetadata {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
    pub fn column(&self, index: usize) -> Option<&ColumnMetadata> {
        self.columns.get(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    /// Typed NULL of the expected type, `Value::Null` when the server cannot tell.
    pub value: Value,
    pub nullable: bool,
}

/// Description of the placeholders of a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMetadata {
    pub parameters: Vec<ParameterInfo>,
}

impl ParameterMetadata {
    pub fn untyped(count: usize) -> Self {
        Self {
            parameters: vec![
                ParameterInfo {
                    value: Value::Null,
                    nullable: true,
                };
                count
            ],
        }
    }
    pub fn count(&self) -> usize {
        self.parameters.len()
    }
}
