use crate::utils::error::{PipelineError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(PipelineError::config(
            field_name,
            format!("value must be at least {min_value}, got {value}"),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_list<T>(field_name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(PipelineError::config(field_name, "list cannot be empty"));
    }
    Ok(())
}

pub fn validate_known_columns(
    field_name: &str,
    configured: &[String],
    known: &[&str],
) -> Result<()> {
    for column in configured {
        if !known.contains(&column.as_str()) {
            return Err(PipelineError::config(
                field_name,
                format!(
                    "unknown column `{column}`; known columns: {}",
                    known.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("cv_folds", 5, 2).is_ok());
        assert!(validate_positive_number("cv_folds", 1, 2).is_err());
    }

    #[test]
    fn test_validate_known_columns() {
        let configured = vec!["floor".to_string()];
        assert!(validate_known_columns("numeric_columns", &configured, &["floor"]).is_ok());

        let bogus = vec!["flor".to_string()];
        assert!(validate_known_columns("numeric_columns", &bogus, &["floor"]).is_err());
    }
}
