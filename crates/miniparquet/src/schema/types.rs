//! Leaf-column projection over the flat schema list.

use crate::basic::{ConvertedType, Repetition, Type};
use crate::format::SchemaElement;

/// A leaf column derived from the schema walk.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub physical_type: Type,
    /// Declared value width, present for FIXED_LEN_BYTE_ARRAY leaves.
    pub type_length: Option<i32>,
    /// Position among leaves, the index of this column's chunk within a
    /// row group's column chunk list.
    pub column_index: usize,
    pub max_def_level: i16,
    pub max_rep_level: i16,
    pub repetition: Option<Repetition>,
    pub converted_type: Option<ConvertedType>,
}

/// Walks the schema in pre-order and returns the leaf columns in
/// left-to-right order.
///
/// Index 0 is the synthetic root; its repetition never contributes to
/// levels. Files with an unusual root are not rejected, the root is
/// simply ignored.
pub fn project_leaves(schema: &[SchemaElement]) -> Vec<ColumnInfo> {
    let mut columns = Vec::new();
    if schema.is_empty() {
        return columns;
    }
    let mut col_index = 0;
    build_recursive(schema, 1, schema.len(), 0, 0, &mut col_index, &mut columns);
    columns
}

fn build_recursive(
    schema: &[SchemaElement],
    mut idx: usize,
    end: usize,
    def_level: i16,
    rep_level: i16,
    col_index: &mut usize,
    out: &mut Vec<ColumnInfo>,
) {
    while idx < end {
        let elem = &schema[idx];
        let mut my_def = def_level;
        let mut my_rep = rep_level;
        match elem.repetition {
            Some(Repetition::Optional) => my_def += 1,
            Some(Repetition::Repeated) => {
                my_def += 1;
                my_rep += 1;
            }
            _ => {}
        }

        let num_children = elem.num_children.unwrap_or(0);
        if num_children > 0 {
            // Group node, find the end of its subtree and recurse.
            idx += 1;
            let mut child_end = idx;
            for _ in 0..num_children {
                if child_end >= end {
                    break;
                }
                child_end = skip_subtree(schema, child_end, end);
            }
            build_recursive(schema, idx, child_end, my_def, my_rep, col_index, out);
            idx = child_end;
        } else {
            out.push(ColumnInfo {
                name: elem.name.clone(),
                physical_type: elem.physical_type.unwrap_or(Type::ByteArray),
                type_length: elem.type_length,
                column_index: *col_index,
                max_def_level: my_def,
                max_rep_level: my_rep,
                repetition: elem.repetition,
                converted_type: elem.converted_type,
            });
            *col_index += 1;
            idx += 1;
        }
    }
}

fn skip_subtree(schema: &[SchemaElement], idx: usize, end: usize) -> usize {
    let num_children = schema[idx].num_children.unwrap_or(0);
    let mut idx = idx + 1;
    for _ in 0..num_children {
        if idx >= end {
            break;
        }
        idx = skip_subtree(schema, idx, end);
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(num_children: i32) -> SchemaElement {
        SchemaElement {
            name: "schema".to_string(),
            num_children: Some(num_children),
            ..Default::default()
        }
    }

    fn leaf(name: &str, physical_type: Type, repetition: Repetition) -> SchemaElement {
        SchemaElement {
            physical_type: Some(physical_type),
            repetition: Some(repetition),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn group(name: &str, repetition: Repetition, num_children: i32) -> SchemaElement {
        SchemaElement {
            repetition: Some(repetition),
            name: name.to_string(),
            num_children: Some(num_children),
            ..Default::default()
        }
    }

    #[test]
    fn flat_schema() {
        let schema = vec![
            root(2),
            leaf("a", Type::Int32, Repetition::Required),
            leaf("b", Type::ByteArray, Repetition::Optional),
        ];
        let columns = project_leaves(&schema);
        assert_eq!(2, columns.len());

        assert_eq!("a", columns[0].name);
        assert_eq!(0, columns[0].column_index);
        assert_eq!(0, columns[0].max_def_level);
        assert_eq!(0, columns[0].max_rep_level);

        assert_eq!("b", columns[1].name);
        assert_eq!(1, columns[1].column_index);
        assert_eq!(1, columns[1].max_def_level);
        assert_eq!(0, columns[1].max_rep_level);
    }

    #[test]
    fn nested_groups_propagate_levels() {
        // message { optional group outer { repeated group inner { required
        // int32 x; optional int64 y; } } required int32 z; }
        let schema = vec![
            root(2),
            group("outer", Repetition::Optional, 1),
            group("inner", Repetition::Repeated, 2),
            leaf("x", Type::Int32, Repetition::Required),
            leaf("y", Type::Int64, Repetition::Optional),
            leaf("z", Type::Int32, Repetition::Required),
        ];
        let columns = project_leaves(&schema);
        assert_eq!(3, columns.len());

        assert_eq!("x", columns[0].name);
        assert_eq!(2, columns[0].max_def_level);
        assert_eq!(1, columns[0].max_rep_level);

        assert_eq!("y", columns[1].name);
        assert_eq!(3, columns[1].max_def_level);
        assert_eq!(1, columns[1].max_rep_level);

        assert_eq!("z", columns[2].name);
        assert_eq!(2, columns[2].column_index);
        assert_eq!(0, columns[2].max_def_level);
        assert_eq!(0, columns[2].max_rep_level);
    }

    #[test]
    fn optional_ancestors_imply_positive_def_levels() {
        let schema = vec![
            root(1),
            group("g", Repetition::Optional, 2),
            leaf("a", Type::Int32, Repetition::Required),
            leaf("b", Type::Int32, Repetition::Optional),
        ];
        for col in project_leaves(&schema) {
            assert!(col.max_def_level >= 1);
        }
    }

    #[test]
    fn empty_schema() {
        assert!(project_leaves(&[]).is_empty());
        assert!(project_leaves(&[root(0)]).is_empty());
    }

    #[test]
    fn type_length_carried_to_leaves() {
        let schema = vec![
            root(1),
            SchemaElement {
                physical_type: Some(Type::FixedLenByteArray),
                type_length: Some(16),
                repetition: Some(Repetition::Required),
                name: "f".to_string(),
                ..Default::default()
            },
        ];
        let columns = project_leaves(&schema);
        assert_eq!(Some(16), columns[0].type_length);
    }

    #[test]
    fn leaf_without_type_defaults_to_byte_array() {
        let schema = vec![
            root(1),
            SchemaElement {
                repetition: Some(Repetition::Required),
                name: "untyped".to_string(),
                ..Default::default()
            },
        ];
        let columns = project_leaves(&schema);
        assert_eq!(Type::ByteArray, columns[0].physical_type);
    }
}
