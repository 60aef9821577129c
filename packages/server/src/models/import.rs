use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::import_record::ImportStatus;
use crate::entity::{company, failed_company, import_record};
use crate::error::AppError;
use crate::utils::phone::is_valid_contact_phone;

use super::shared::normalize_optional;

/// Unified social credit code: 18 characters, no I, O, S, V or Z.
static CREDIT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-HJ-NPQRTUWXY]{18}$").expect("valid regex"));

pub const MAX_IMPORT_ROWS: usize = 5000;
pub const MAX_COMPANY_NAME_CHARS: usize = 200;

/// One row of a company import as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CompanyRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "creditCode")]
    pub credit_code: Option<String>,
    #[serde(default, alias = "contactPerson")]
    pub contact_person: Option<String>,
    #[serde(default, alias = "contactPhone")]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A row that passed field validation, trimmed and normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCompany {
    pub name: String,
    pub credit_code: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
}

/// Check a single row in isolation. The error is the failure reason stored
/// with the row.
pub fn validate_company_row(row: &CompanyRow) -> Result<ValidCompany, String> {
    let name = normalize_optional(row.name.clone()).ok_or("公司名称不能为空")?;
    if name.chars().count() > MAX_COMPANY_NAME_CHARS {
        return Err(format!("公司名称超过{MAX_COMPANY_NAME_CHARS}个字符"));
    }

    let credit_code = normalize_optional(row.credit_code.clone()).map(|c| c.to_uppercase());
    if let Some(ref code) = credit_code
        && !CREDIT_CODE_RE.is_match(code)
    {
        return Err(format!("统一社会信用代码格式错误: {code}"));
    }

    let contact_phone = normalize_optional(row.contact_phone.clone());
    if let Some(ref phone) = contact_phone
        && !is_valid_contact_phone(phone)
    {
        return Err(format!("联系电话格式错误: {phone}"));
    }

    Ok(ValidCompany {
        name,
        credit_code,
        contact_person: normalize_optional(row.contact_person.clone()),
        contact_phone,
        address: normalize_optional(row.address.clone()),
        category: normalize_optional(row.category.clone()),
    })
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImportCompaniesRequest {
    pub file_name: Option<String>,
    pub companies: Vec<CompanyRow>,
}

pub fn validate_import_request(req: &ImportCompaniesRequest) -> Result<(), AppError> {
    if req.companies.is_empty() {
        return Err(AppError::Validation("companies must not be empty".into()));
    }
    if req.companies.len() > MAX_IMPORT_ROWS {
        return Err(AppError::Validation(format!(
            "Too many companies: max {MAX_IMPORT_ROWS} per import"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct RowFailure {
    /// 1-based position in the submitted list.
    pub row_number: i32,
    pub company_name: Option<String>,
    pub reason: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImportSummary {
    pub import_id: i32,
    pub batch_id: String,
    pub total_rows: i32,
    pub success_count: i32,
    pub failed_count: i32,
    pub status: ImportStatus,
    pub failures: Vec<RowFailure>,
}

/// Names and credit codes already stored, used to reject re-imports.
#[derive(Debug, Default)]
pub struct ExistingKeys {
    pub names: HashSet<String>,
    pub credit_codes: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct Partition {
    /// `(row_number, company)` for rows to insert.
    pub valid: Vec<(i32, ValidCompany)>,
    pub failures: Vec<RowFailure>,
}

/// Split a batch into insertable rows and failures. A row fails on invalid
/// fields, on a name or credit code already stored, or on one seen earlier
/// in the same batch.
pub fn partition_rows(rows: &[CompanyRow], existing: &ExistingKeys) -> Partition {
    let mut out = Partition::default();
    let mut seen_names = HashSet::new();
    let mut seen_codes = HashSet::new();

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx as i32 + 1;
        let fail = |reason: String| RowFailure {
            row_number,
            company_name: normalize_optional(row.name.clone()),
            reason,
        };

        let company = match validate_company_row(row) {
            Ok(c) => c,
            Err(reason) => {
                out.failures.push(fail(reason));
                continue;
            }
        };

        let reason = if existing.names.contains(&company.name) {
            Some("公司名称已存在".to_string())
        } else if company
            .credit_code
            .as_ref()
            .is_some_and(|c| existing.credit_codes.contains(c))
        {
            Some("统一社会信用代码已存在".to_string())
        } else if !seen_names.insert(company.name.clone()) {
            Some("公司名称在本批次中重复".to_string())
        } else if company
            .credit_code
            .as_ref()
            .is_some_and(|c| !seen_codes.insert(c.clone()))
        {
            Some("统一社会信用代码在本批次中重复".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => out.failures.push(fail(reason)),
            None => out.valid.push((row_number, company)),
        }
    }
    out
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ImportStatus>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImportRecordResponse {
    pub id: i32,
    pub batch_id: String,
    pub file_name: Option<String>,
    pub total_rows: i32,
    pub success_count: i32,
    pub failed_count: i32,
    pub status: ImportStatus,
    pub created_at: DateTime<Utc>,
}

impl From<import_record::Model> for ImportRecordResponse {
    fn from(m: import_record::Model) -> Self {
        Self {
            id: m.id,
            batch_id: m.batch_id,
            file_name: m.file_name,
            total_rows: m.total_rows,
            success_count: m.success_count,
            failed_count: m.failed_count,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FailedCompanyResponse {
    pub id: i32,
    pub row_number: i32,
    pub company_name: Option<String>,
    pub reason: String,
    #[schema(value_type = Object)]
    pub raw_data: serde_json::Value,
}

impl From<failed_company::Model> for FailedCompanyResponse {
    fn from(m: failed_company::Model) -> Self {
        Self {
            id: m.id,
            row_number: m.row_number,
            company_name: m.company_name,
            reason: m.reason,
            raw_data: m.raw_data,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImportDetailResponse {
    #[serde(flatten)]
    pub record: ImportRecordResponse,
    pub failures: Vec<FailedCompanyResponse>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompanyListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches name, credit code or contact person.
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompanyResponse {
    pub id: i32,
    pub name: String,
    pub credit_code: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub import_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<company::Model> for CompanyResponse {
    fn from(m: company::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            credit_code: m.credit_code,
            contact_person: m.contact_person,
            contact_phone: m.contact_phone,
            address: m.address,
            category: m.category,
            import_id: m.import_id,
            created_at: m.created_at,
        }
    }
}
