use crate::error::FairnessError;
use chrono::SecondsFormat;
use vantage_types::{Column, ColumnData, OutcomeRule};

/// Map an outcome column to favorable (`true`) / unfavorable (`false`).
///
/// * boolean: as-is, or compared with a `positive_label` of `"true"`/`"false"`
/// * categorical / text: `positive_label` required
/// * numeric: `threshold` rule, or no rule when every value is 0 or 1
///
/// Nulls stay null. Any other combination is an `InvalidOutcomeColumn`.
pub fn binarize_outcome(
    column: &Column,
    rule: Option<&OutcomeRule>,
) -> Result<Vec<Option<bool>>, FairnessError> {
    let name = column.name();
    let kind = column.kind();

    match (column.data(), rule) {
        (ColumnData::Boolean(values), None) => Ok(values.clone()),
        (ColumnData::Boolean(values), Some(OutcomeRule::PositiveLabel { label })) => Ok(values
            .iter()
            .map(|v| v.map(|b| b.to_string() == *label))
            .collect()),

        (ColumnData::Categorical(values), Some(OutcomeRule::PositiveLabel { label }))
        | (ColumnData::Text(values), Some(OutcomeRule::PositiveLabel { label })) => Ok(values
            .iter()
            .map(|v| v.as_ref().map(|s| s == label))
            .collect()),
        (ColumnData::Categorical(_), _) | (ColumnData::Text(_), _) => Err(
            FairnessError::invalid_outcome(name, kind, "a positive_label rule is required"),
        ),

        (ColumnData::Numeric(values), Some(OutcomeRule::Threshold { value, operator })) => {
            Ok(values
                .iter()
                .map(|v| v.map(|x| operator.apply(x, *value)))
                .collect())
        }
        (ColumnData::Numeric(values), None) => {
            if values.iter().flatten().any(|x| *x != 0.0 && *x != 1.0) {
                return Err(FairnessError::invalid_outcome(
                    name,
                    kind,
                    "numeric outcomes without a threshold rule must be 0 or 1",
                ));
            }
            Ok(values.iter().map(|v| v.map(|x| x == 1.0)).collect())
        }

        (ColumnData::Datetime(_), _) => Err(FairnessError::invalid_outcome(
            name,
            kind,
            "datetime columns cannot be used as outcomes",
        )),
        (_, Some(rule)) => Err(FairnessError::invalid_outcome(
            name,
            kind,
            format!("rule {rule:?} does not apply to this column"),
        )),
    }
}

/// Group label of every row of the sensitive column, any kind.
pub fn group_labels(column: &Column) -> Vec<Option<String>> {
    match column.data() {
        ColumnData::Numeric(values) => values
            .iter()
            // -0.0 and 0.0 are one group
            .map(|v| v.map(|x| (if x == 0.0 { 0.0f64 } else { x }).to_string()))
            .collect(),
        ColumnData::Datetime(values) => values
            .iter()
            .map(|v| v.map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .collect(),
        data => data.labels().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_types::ComparisonOperator;

    #[test]
    fn test_boolean_outcome() {
        let column = Column::boolean("approved", vec![Some(true), None, Some(false)]);

        assert_eq!(
            binarize_outcome(&column, None).unwrap(),
            vec![Some(true), None, Some(false)]
        );

        let inverted = OutcomeRule::PositiveLabel {
            label: "false".to_string(),
        };
        assert_eq!(
            binarize_outcome(&column, Some(&inverted)).unwrap(),
            vec![Some(false), None, Some(true)]
        );
    }

    #[test]
    fn test_label_outcome() {
        let column = Column::categorical("decision", vec![Some("hire"), Some("reject"), None]);
        let rule = OutcomeRule::PositiveLabel {
            label: "hire".to_string(),
        };

        assert_eq!(
            binarize_outcome(&column, Some(&rule)).unwrap(),
            vec![Some(true), Some(false), None]
        );
        assert!(matches!(
            binarize_outcome(&column, None),
            Err(FairnessError::InvalidOutcomeColumn { .. })
        ));
    }

    #[test]
    fn test_threshold_outcome() {
        let column = Column::numeric_values("score", vec![0.2, 0.5, 0.9]);
        let gt = OutcomeRule::Threshold {
            value: 0.5,
            operator: ComparisonOperator::Gt,
        };
        let le = OutcomeRule::Threshold {
            value: 0.5,
            operator: ComparisonOperator::Le,
        };

        assert_eq!(
            binarize_outcome(&column, Some(&gt)).unwrap(),
            vec![Some(false), Some(false), Some(true)]
        );
        assert_eq!(
            binarize_outcome(&column, Some(&le)).unwrap(),
            vec![Some(true), Some(true), Some(false)]
        );
    }

    #[test]
    fn test_numeric_without_rule_must_be_binary() {
        let binary = Column::numeric("y", vec![Some(0.0), Some(1.0), None]);
        assert_eq!(
            binarize_outcome(&binary, None).unwrap(),
            vec![Some(false), Some(true), None]
        );

        let scores = Column::numeric_values("y", vec![0.0, 0.7]);
        assert!(binarize_outcome(&scores, None).is_err());
    }

    #[test]
    fn test_group_labels() {
        let numeric = Column::numeric("age_band", vec![Some(1.0), None, Some(2.5)]);
        assert_eq!(
            group_labels(&numeric),
            vec![Some("1".to_string()), None, Some("2.5".to_string())]
        );

        let flags = Column::boolean_values("member", vec![true, false]);
        assert_eq!(
            group_labels(&flags),
            vec![Some("true".to_string()), Some("false".to_string())]
        );
    }

    #[test]
    fn test_signed_zero_is_one_group() {
        let column = Column::numeric_values("band", vec![-0.0, 0.0, 1.0]);

        assert_eq!(
            group_labels(&column),
            vec![
                Some("0".to_string()),
                Some("0".to_string()),
                Some("1".to_string()),
            ]
        );
    }
}
