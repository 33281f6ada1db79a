use crate::schema::{any, array, boolean, number, string, ObjectSchema, Schema, SchemaExt};

/// 由对象 schema 描述的模型
///
/// 通常通过 `#[derive(SchemaModel)]` 从结构体字段生成
pub trait SchemaModel {
    fn schema() -> ObjectSchema;
}

/// 可以作为返回值 schema 的类型
///
/// 模型类型返回其对象 schema，`Vec<T>` 返回元素为 `T` 的数组 schema
pub trait OutputSchema {
    fn output_schema() -> Schema;
}

impl<T: SchemaModel> OutputSchema for T {
    fn output_schema() -> Schema {
        T::schema().into()
    }
}

impl<T: OutputSchema> OutputSchema for Vec<T> {
    fn output_schema() -> Schema {
        array(T::output_schema()).into()
    }
}

impl<T: OutputSchema> OutputSchema for Option<T> {
    fn output_schema() -> Schema {
        T::output_schema().nullable()
    }
}

macro_rules! impl_scalar_output {
    ($($ty:ty => $schema:expr),* $(,)?) => {
        $(
            impl OutputSchema for $ty {
                fn output_schema() -> Schema {
                    $schema.into()
                }
            }
        )*
    };
}

impl_scalar_output! {
    String => string(),
    bool => boolean(),
    i32 => number().int().min(i32::MIN as f64).max(i32::MAX as f64),
    i64 => number().int(),
    u32 => number().int().min(0.0).max(u32::MAX as f64),
    u64 => number().int().nonnegative(),
    f64 => number(),
    serde_json::Value => any(),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag;

    impl SchemaModel for Tag {
        fn schema() -> ObjectSchema {
            crate::schema::object().named("Tag").field("name", string())
        }
    }

    #[test]
    fn test_output_schema_of_models_and_lists() {
        assert_eq!(Tag::output_schema().describe(), "Tag");
        assert_eq!(<Vec<Tag>>::output_schema().describe(), "[Tag]");
        assert!(<Option<Tag>>::output_schema().is_nullable());
        assert_eq!(i64::output_schema().describe(), "Int");
        assert_eq!(bool::output_schema().describe(), "Boolean");
    }
}
