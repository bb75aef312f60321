use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::{FieldError, HrError, HrResult},
    model::{
        attendance::AttendanceStatus,
        salary::{
            SalaryComponents, SalaryComponentsPatch, SalaryDeductions, SalaryDeductionsPatch,
            SalaryProfile, negative_entries,
        },
    },
    store::{AttendanceFilter, HrStore},
    utils::calendar::{Month, round2},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryInput {
    #[serde(alias = "userId")]
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 50000.0)]
    pub base_wage: f64,
    #[serde(default)]
    pub components: SalaryComponentsPatch,
    #[serde(default)]
    pub deductions: SalaryDeductionsPatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryComputation {
    pub total_components: f64,
    pub total_deductions: f64,
    pub monthly_salary: f64,
    pub yearly_salary: f64,
}

/// Components are checked against the base wage but only deductions reduce it.
pub fn compute(
    base_wage: f64,
    components: &SalaryComponents,
    deductions: &SalaryDeductions,
) -> HrResult<SalaryComputation> {
    let mut errors = Vec::new();
    if !base_wage.is_finite() || base_wage < 0.0 {
        errors.push(FieldError::new("baseWage", "Base wage must be a non-negative number"));
    }
    for field in negative_entries(components, deductions) {
        errors.push(FieldError::new(field, "Amount must not be negative"));
    }
    HrError::check(errors)?;

    let total_components = components.resolve(base_wage).total();
    if total_components > base_wage {
        return Err(HrError::ComponentsExceedBaseWage);
    }

    let total_deductions = deductions.resolve(base_wage).total();
    let monthly_salary = base_wage - total_deductions;

    Ok(SalaryComputation {
        total_components,
        total_deductions,
        monthly_salary,
        yearly_salary: monthly_salary * 12.0,
    })
}

/// Creates or replaces the profile; supplied entries are merged over the stored ones.
pub async fn upsert(store: &dyn HrStore, input: SalaryInput, now: DateTime<Utc>) -> HrResult<SalaryProfile> {
    if store.find_employee(input.employee_id).await?.is_none() {
        return Err(HrError::NotFound("Employee"));
    }

    let (mut components, mut deductions) = match store.find_salary(input.employee_id).await? {
        Some(existing) => (existing.components, existing.deductions),
        None => (SalaryComponents::default(), SalaryDeductions::default()),
    };
    input.components.apply(&mut components);
    input.deductions.apply(&mut deductions);

    let computed = compute(input.base_wage, &components, &deductions)?;

    let profile = SalaryProfile {
        employee_id: input.employee_id,
        base_wage: input.base_wage,
        components,
        deductions,
        monthly_salary: computed.monthly_salary,
        yearly_salary: computed.yearly_salary,
        last_updated: now,
    };
    store.save_salary(&profile).await?;

    info!(
        employee_id = profile.employee_id,
        base_wage = profile.base_wage,
        monthly_salary = profile.monthly_salary,
        "Salary profile saved"
    );
    Ok(profile)
}

pub async fn get(store: &dyn HrStore, employee_id: u64) -> HrResult<SalaryProfile> {
    store
        .find_salary(employee_id)
        .await?
        .ok_or(HrError::NotFound("Salary profile"))
}

pub async fn list(store: &dyn HrStore, employee_id: Option<u64>) -> HrResult<Vec<SalaryProfile>> {
    Ok(store.list_salaries(employee_id).await?)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayrollPreview {
    pub employee_id: u64,
    #[schema(value_type = String, example = "2024-02")]
    pub month: Month,
    pub days_in_month: u32,
    pub present_days: u32,
    pub daily_wage: f64,
    pub payable_amount: f64,
    pub provident_fund: f64,
    pub professional_tax: f64,
    pub total_deductions: f64,
    pub net_salary: f64,
}

/// Attendance-prorated pay for one month. Nothing is persisted.
pub async fn payroll_preview(store: &dyn HrStore, employee_id: u64, month: Month) -> HrResult<PayrollPreview> {
    let profile = get(store, employee_id).await?;

    let records = store
        .list_attendance(&AttendanceFilter {
            employee_id: Some(employee_id),
            from: Some(month.first_day()),
            to: Some(month.last_day()),
        })
        .await?;
    let present_days = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count() as u32;

    let days_in_month = month.days();
    let daily_wage = profile.base_wage / f64::from(days_in_month);
    let payable_amount = daily_wage * f64::from(present_days);

    let provident_fund = profile.deductions.provident_fund.resolve(payable_amount);
    let professional_tax = profile.deductions.professional_tax.resolve(payable_amount);
    let total_deductions = provident_fund + professional_tax;

    Ok(PayrollPreview {
        employee_id,
        month,
        days_in_month,
        present_days,
        daily_wage: round2(daily_wage),
        payable_amount: round2(payable_amount),
        provident_fund: round2(provident_fund),
        professional_tax: round2(professional_tax),
        total_deductions: round2(total_deductions),
        net_salary: round2(payable_amount - total_deductions),
    })
}
