//! Document profiles: which fields to ask the VLM for, per document type.
//!
//! The instruction sent to the model and the columns that come back are two
//! sides of the same contract. Each [`DocumentType`] maps to a
//! [`DocumentProfile`] holding the field list and the instruction template,
//! so request construction in [`crate::pipeline::llm`] never hard-codes a
//! field name. New document types only need a new profile, either built in
//! here or loaded from JSON with [`DocumentProfile::from_json_file`].

use crate::error::DocExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default instruction template. `{fields}` is replaced by the rendered field list.
pub const DEFAULT_INSTRUCTION_TEMPLATE: &str =
    "Extract contents in this document and return them in json {fields}";

/// Placeholder substituted in [`DocumentProfile::instruction_template`].
pub const FIELDS_PLACEHOLDER: &str = "{fields}";

/// The fixed set of document types offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    #[default]
    PurchaseOrder,
    Invoice,
    BankStatement,
    IdentityDocument,
    Payslip,
    LocalPurchaseOrder,
}

impl DocumentType {
    /// All document types, in the order they are presented to the user.
    pub const ALL: [DocumentType; 6] = [
        DocumentType::PurchaseOrder,
        DocumentType::Invoice,
        DocumentType::BankStatement,
        DocumentType::IdentityDocument,
        DocumentType::Payslip,
        DocumentType::LocalPurchaseOrder,
    ];

    /// Human-readable label, e.g. "Purchase Order".
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::PurchaseOrder => "Purchase Order",
            DocumentType::Invoice => "Invoice",
            DocumentType::BankStatement => "Bank Statement",
            DocumentType::IdentityDocument => "Identity Document",
            DocumentType::Payslip => "Payslip",
            DocumentType::LocalPurchaseOrder => "Local Purchase Order",
        }
    }

    /// Built-in profile for this document type.
    pub fn profile(&self) -> DocumentProfile {
        let fields = match self {
            DocumentType::PurchaseOrder | DocumentType::LocalPurchaseOrder => purchase_order_fields(),
            DocumentType::Invoice => vec![
                FieldSpec::scalar("invoice_number"),
                FieldSpec::scalar("invoice_date"),
                FieldSpec::scalar("due_date"),
                FieldSpec::scalar("supplier_name"),
                FieldSpec::scalar("supplier_address"),
                FieldSpec::scalar("customer_name"),
                FieldSpec::scalar("customer_address"),
                FieldSpec::list("items", &["item_description", "item_quantity", "item_price"]),
                FieldSpec::scalar("subtotal"),
                FieldSpec::scalar("tax_amount"),
                FieldSpec::scalar("total_amount"),
            ],
            DocumentType::BankStatement => vec![
                FieldSpec::scalar("bank_name"),
                FieldSpec::scalar("account_holder_name"),
                FieldSpec::scalar("account_number"),
                FieldSpec::scalar("statement_period_start"),
                FieldSpec::scalar("statement_period_end"),
                FieldSpec::scalar("opening_balance"),
                FieldSpec::scalar("closing_balance"),
                FieldSpec::list(
                    "transactions",
                    &[
                        "transaction_date",
                        "transaction_description",
                        "transaction_amount",
                        "transaction_balance",
                    ],
                ),
            ],
            DocumentType::IdentityDocument => vec![
                FieldSpec::scalar("document_type"),
                FieldSpec::scalar("document_number"),
                FieldSpec::scalar("full_name"),
                FieldSpec::scalar("date_of_birth"),
                FieldSpec::scalar("nationality"),
                FieldSpec::scalar("sex"),
                FieldSpec::scalar("issue_date"),
                FieldSpec::scalar("expiry_date"),
                FieldSpec::scalar("issuing_authority"),
            ],
            DocumentType::Payslip => vec![
                FieldSpec::scalar("employer_name"),
                FieldSpec::scalar("employee_name"),
                FieldSpec::scalar("employee_id"),
                FieldSpec::scalar("pay_period"),
                FieldSpec::scalar("pay_date"),
                FieldSpec::list("earnings", &["earning_description", "earning_amount"]),
                FieldSpec::list("deductions", &["deduction_description", "deduction_amount"]),
                FieldSpec::scalar("gross_pay"),
                FieldSpec::scalar("net_pay"),
            ],
        };

        DocumentProfile {
            label: self.label().to_string(),
            fields,
            instruction_template: DEFAULT_INSTRUCTION_TEMPLATE.to_string(),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentType {
    type Err = DocExtractError;

    /// Accepts the label ("Purchase Order") or a kebab/snake form
    /// ("purchase-order", "purchase_order"), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c.to_ascii_lowercase() })
            .collect();
        match norm.as_str() {
            "purchase-order" | "po" => Ok(DocumentType::PurchaseOrder),
            "invoice" => Ok(DocumentType::Invoice),
            "bank-statement" => Ok(DocumentType::BankStatement),
            "identity-document" | "id" => Ok(DocumentType::IdentityDocument),
            "payslip" => Ok(DocumentType::Payslip),
            "local-purchase-order" | "lpo" => Ok(DocumentType::LocalPurchaseOrder),
            _ => Err(DocExtractError::InvalidConfig(format!(
                "unknown document type '{s}'"
            ))),
        }
    }
}

fn purchase_order_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::scalar("purchase_order_number"),
        FieldSpec::scalar("purchase_order_date"),
        FieldSpec::scalar("supplier_name"),
        FieldSpec::scalar("supplier_address"),
        FieldSpec::scalar("buyer_name"),
        FieldSpec::scalar("buyer_address"),
        FieldSpec::list("items", &["item_description", "item_quantity", "item_price"]),
        FieldSpec::scalar("total_amount"),
    ]
}

/// One requested field. A non-empty `children` list marks a repeated group
/// (e.g. line items) whose entries carry those sub-fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl FieldSpec {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn list(name: impl Into<String>, children: &[&str]) -> Self {
        Self {
            name: name.into(),
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// `name` or `name (child_a, child_b)`.
    pub fn render(&self) -> String {
        if self.children.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.children.join(", "))
        }
    }
}

/// Field list and instruction template for one kind of document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub label: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default = "default_template")]
    pub instruction_template: String,
}

fn default_template() -> String {
    DEFAULT_INSTRUCTION_TEMPLATE.to_string()
}

impl DocumentProfile {
    /// The instruction text sent ahead of the page images.
    pub fn instruction(&self) -> String {
        let fields = self
            .fields
            .iter()
            .map(FieldSpec::render)
            .collect::<Vec<_>>()
            .join(", ");
        self.instruction_template.replace(FIELDS_PLACEHOLDER, &fields)
    }

    /// Load a custom profile from a JSON file.
    ///
    /// ```json
    /// { "label": "Delivery Note",
    ///   "fields": [ {"name": "note_number"},
    ///               {"name": "lines", "children": ["sku", "qty"]} ] }
    /// ```
    pub fn from_json_file(path: &Path) -> Result<Self, DocExtractError> {
        let raw = std::fs::read_to_string(path).map_err(|e| DocExtractError::ProfileLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let profile: DocumentProfile =
            serde_json::from_str(&raw).map_err(|e| DocExtractError::ProfileLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        profile.validate().map_err(|detail| DocExtractError::ProfileLoad {
            path: path.to_path_buf(),
            detail,
        })?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("profile must list at least one field".into());
        }
        if let Some(f) = self.fields.iter().find(|f| f.name.trim().is_empty()) {
            return Err(format!("field with empty name (children: {:?})", f.children));
        }
        if !self.instruction_template.contains(FIELDS_PLACEHOLDER) {
            return Err(format!(
                "instruction_template must contain the {FIELDS_PLACEHOLDER} placeholder"
            ));
        }
        Ok(())
    }
}

impl Default for DocumentProfile {
    fn default() -> Self {
        DocumentType::default().profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn purchase_order_instruction_lists_all_fields() {
        let text = DocumentType::PurchaseOrder.profile().instruction();
        assert_eq!(
            text,
            "Extract contents in this document and return them in json \
             purchase_order_number, purchase_order_date, supplier_name, supplier_address, \
             buyer_name, buyer_address, items (item_description, item_quantity, item_price), \
             total_amount"
        );
    }

    #[test]
    fn local_po_shares_po_fields() {
        assert_eq!(
            DocumentType::LocalPurchaseOrder.profile().fields,
            DocumentType::PurchaseOrder.profile().fields
        );
    }

    #[test]
    fn six_types_with_distinct_labels() {
        let labels: std::collections::HashSet<_> =
            DocumentType::ALL.iter().map(|t| t.label()).collect();
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn parse_document_type_variants() {
        assert_eq!("Purchase Order".parse::<DocumentType>().unwrap(), DocumentType::PurchaseOrder);
        assert_eq!("bank_statement".parse::<DocumentType>().unwrap(), DocumentType::BankStatement);
        assert_eq!("LPO".parse::<DocumentType>().unwrap(), DocumentType::LocalPurchaseOrder);
        assert!("receipt".parse::<DocumentType>().is_err());
    }

    #[test]
    fn every_builtin_profile_is_valid() {
        for t in DocumentType::ALL {
            assert!(t.profile().validate().is_ok(), "{t}");
        }
    }

    #[test]
    fn load_custom_profile_from_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"label":"Delivery Note","fields":[{{"name":"note_number"}},{{"name":"lines","children":["sku","qty"]}}]}}"#
        )
        .unwrap();
        let p = DocumentProfile::from_json_file(f.path()).unwrap();
        assert_eq!(p.label, "Delivery Note");
        assert!(p.instruction().ends_with("note_number, lines (sku, qty)"));
    }

    #[test]
    fn custom_profile_without_placeholder_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"label":"X","fields":[{{"name":"a"}}],"instruction_template":"no placeholder"}}"#
        )
        .unwrap();
        let err = DocumentProfile::from_json_file(f.path()).unwrap_err();
        assert!(matches!(err, DocExtractError::ProfileLoad { .. }));
    }
}
