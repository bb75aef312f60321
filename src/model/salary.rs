use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A pay component or deduction, either a fixed amount or a share of the base wage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompensationComponent {
    Fixed { amount: f64 },
    Percentage { percentage: f64 },
}

impl CompensationComponent {
    pub const ZERO: Self = CompensationComponent::Fixed { amount: 0.0 };

    pub fn resolve(&self, base_wage: f64) -> f64 {
        match *self {
            CompensationComponent::Fixed { amount } => amount,
            CompensationComponent::Percentage { percentage } => base_wage * percentage / 100.0,
        }
    }

    fn is_negative(&self) -> bool {
        match *self {
            CompensationComponent::Fixed { amount } => amount < 0.0,
            CompensationComponent::Percentage { percentage } => percentage < 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryComponents {
    pub basic: CompensationComponent,
    pub hra: CompensationComponent,
    pub standard_allowance: CompensationComponent,
    pub performance_bonus: CompensationComponent,
    pub leave_travel_allowance: CompensationComponent,
    pub fixed_allowance: CompensationComponent,
}

impl Default for SalaryComponents {
    fn default() -> Self {
        Self {
            basic: CompensationComponent::Percentage { percentage: 50.0 },
            hra: CompensationComponent::Percentage { percentage: 40.0 },
            standard_allowance: CompensationComponent::ZERO,
            performance_bonus: CompensationComponent::ZERO,
            leave_travel_allowance: CompensationComponent::ZERO,
            fixed_allowance: CompensationComponent::ZERO,
        }
    }
}

impl SalaryComponents {
    fn all(&self) -> [(&'static str, &CompensationComponent); 6] {
        [
            ("components.basic", &self.basic),
            ("components.hra", &self.hra),
            ("components.standardAllowance", &self.standard_allowance),
            ("components.performanceBonus", &self.performance_bonus),
            ("components.leaveTravelAllowance", &self.leave_travel_allowance),
            ("components.fixedAllowance", &self.fixed_allowance),
        ]
    }

    pub fn resolve(&self, base_wage: f64) -> ResolvedComponents {
        ResolvedComponents {
            basic: self.basic.resolve(base_wage),
            hra: self.hra.resolve(base_wage),
            standard_allowance: self.standard_allowance.resolve(base_wage),
            performance_bonus: self.performance_bonus.resolve(base_wage),
            leave_travel_allowance: self.leave_travel_allowance.resolve(base_wage),
            fixed_allowance: self.fixed_allowance.resolve(base_wage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryDeductions {
    pub provident_fund: CompensationComponent,
    pub professional_tax: CompensationComponent,
}

impl Default for SalaryDeductions {
    fn default() -> Self {
        Self {
            provident_fund: CompensationComponent::Percentage { percentage: 12.0 },
            professional_tax: CompensationComponent::ZERO,
        }
    }
}

impl SalaryDeductions {
    fn all(&self) -> [(&'static str, &CompensationComponent); 2] {
        [
            ("deductions.providentFund", &self.provident_fund),
            ("deductions.professionalTax", &self.professional_tax),
        ]
    }

    pub fn resolve(&self, base_wage: f64) -> ResolvedDeductions {
        ResolvedDeductions {
            provident_fund: self.provident_fund.resolve(base_wage),
            professional_tax: self.professional_tax.resolve(base_wage),
        }
    }
}

/// Field names of every negative amount or percentage.
pub fn negative_entries(components: &SalaryComponents, deductions: &SalaryDeductions) -> Vec<&'static str> {
    components
        .all()
        .into_iter()
        .chain(deductions.all())
        .filter(|(_, c)| c.is_negative())
        .map(|(name, _)| name)
        .collect()
}

/// Partial component set; present entries replace the stored ones.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryComponentsPatch {
    pub basic: Option<CompensationComponent>,
    pub hra: Option<CompensationComponent>,
    pub standard_allowance: Option<CompensationComponent>,
    pub performance_bonus: Option<CompensationComponent>,
    pub leave_travel_allowance: Option<CompensationComponent>,
    pub fixed_allowance: Option<CompensationComponent>,
}

impl SalaryComponentsPatch {
    pub fn apply(self, target: &mut SalaryComponents) {
        if let Some(c) = self.basic {
            target.basic = c;
        }
        if let Some(c) = self.hra {
            target.hra = c;
        }
        if let Some(c) = self.standard_allowance {
            target.standard_allowance = c;
        }
        if let Some(c) = self.performance_bonus {
            target.performance_bonus = c;
        }
        if let Some(c) = self.leave_travel_allowance {
            target.leave_travel_allowance = c;
        }
        if let Some(c) = self.fixed_allowance {
            target.fixed_allowance = c;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryDeductionsPatch {
    pub provident_fund: Option<CompensationComponent>,
    pub professional_tax: Option<CompensationComponent>,
}

impl SalaryDeductionsPatch {
    pub fn apply(self, target: &mut SalaryDeductions) {
        if let Some(c) = self.provident_fund {
            target.provident_fund = c;
        }
        if let Some(c) = self.professional_tax {
            target.professional_tax = c;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedComponents {
    pub basic: f64,
    pub hra: f64,
    pub standard_allowance: f64,
    pub performance_bonus: f64,
    pub leave_travel_allowance: f64,
    pub fixed_allowance: f64,
}

impl ResolvedComponents {
    pub fn total(&self) -> f64 {
        self.basic
            + self.hra
            + self.standard_allowance
            + self.performance_bonus
            + self.leave_travel_allowance
            + self.fixed_allowance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDeductions {
    pub provident_fund: f64,
    pub professional_tax: f64,
}

impl ResolvedDeductions {
    pub fn total(&self) -> f64 {
        self.provident_fund + self.professional_tax
    }
}

/// Stored compensation structure of one employee.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryProfile {
    pub employee_id: u64,
    pub base_wage: f64,
    pub components: SalaryComponents,
    pub deductions: SalaryDeductions,
    pub monthly_salary: f64,
    pub yearly_salary: f64,
    pub last_updated: DateTime<Utc>,
}

impl SalaryProfile {
    pub fn view(&self) -> SalaryProfileView {
        let components = self.components.resolve(self.base_wage);
        let deductions = self.deductions.resolve(self.base_wage);

        SalaryProfileView {
            employee_id: self.employee_id,
            base_wage: self.base_wage,
            components: self.components.clone(),
            deductions: self.deductions.clone(),
            component_amounts: components,
            deduction_amounts: deductions,
            total_components: components.total(),
            total_deductions: deductions.total(),
            monthly_salary: self.monthly_salary,
            yearly_salary: self.yearly_salary,
            last_updated: self.last_updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryProfileView {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 50000.0)]
    pub base_wage: f64,
    pub components: SalaryComponents,
    pub deductions: SalaryDeductions,
    pub component_amounts: ResolvedComponents,
    pub deduction_amounts: ResolvedDeductions,
    pub total_components: f64,
    pub total_deductions: f64,
    #[schema(example = 43800.0)]
    pub monthly_salary: f64,
    #[schema(example = 525600.0)]
    pub yearly_salary: f64,
    #[schema(value_type = String, format = "date-time")]
    pub last_updated: DateTime<Utc>,
}
