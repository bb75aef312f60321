use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    #[schema(example = "001234567890")]
    pub account_number: Option<String>,
    #[schema(example = "State Bank")]
    pub bank_name: Option<String>,
    #[schema(example = "SBIN0000123")]
    pub ifsc_code: Option<String>,
    #[schema(example = "ABCDE1234F")]
    pub pan: Option<String>,
    #[schema(example = "100200300400")]
    pub uan: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "loginId": "ACJD20240001",
        "name": "John Doe",
        "email": "john.doe@company.com",
        "company": "Acme Corp",
        "companyCode": "AC",
        "department": "Engineering",
        "manager": null,
        "phone": "+8801712345678",
        "address": null,
        "yearOfJoining": 2024,
        "serialNumber": 1,
        "employeeInitials": "JD",
        "bankDetails": {},
        "isActive": true,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    pub id: u64,
    pub login_id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub company_code: String,
    pub department: Option<String>,
    pub manager: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub year_of_joining: i32,
    pub serial_number: u32,
    pub employee_initials: String,
    pub bank_details: BankDetails,
    /// Cleared by deactivation; the record itself is never deleted.
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub login_id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub company_code: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub year_of_joining: i32,
    pub serial_number: u32,
    pub employee_initials: String,
}

/// Editable profile fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfileUpdate {
    #[schema(example = "John Doe")]
    pub name: Option<String>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    pub manager: Option<String>,
    #[schema(example = "+8801712345678")]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bank_details: Option<BankDetails>,
}

impl Employee {
    pub fn apply_update(&mut self, update: EmployeeProfileUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
            self.name = name.trim().to_string();
        }
        if update.department.is_some() {
            self.department = update.department;
        }
        if update.manager.is_some() {
            self.manager = update.manager;
        }
        if update.phone.is_some() {
            self.phone = update.phone;
        }
        if update.address.is_some() {
            self.address = update.address;
        }
        if let Some(bank) = update.bank_details {
            let current = &mut self.bank_details;
            // field-wise merge, a missing field keeps what is on file
            current.account_number = bank.account_number.or(current.account_number.take());
            current.bank_name = bank.bank_name.or(current.bank_name.take());
            current.ifsc_code = bank.ifsc_code.or(current.ifsc_code.take());
            current.pan = bank.pan.or(current.pan.take());
            current.uan = bank.uan.or(current.uan.take());
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> Employee {
        let now = Utc::now();
        Employee {
            id: 1,
            login_id: "ACJD20240001".into(),
            name: "John Doe".into(),
            email: "john@acme.test".into(),
            company: "Acme".into(),
            company_code: "AC".into(),
            department: Some("Ops".into()),
            manager: None,
            phone: None,
            address: None,
            year_of_joining: 2024,
            serial_number: 1,
            employee_initials: "JD".into(),
            bank_details: BankDetails {
                bank_name: Some("First Bank".into()),
                ..Default::default()
            },
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn update_keeps_absent_fields() {
        let mut emp = employee();
        emp.apply_update(
            EmployeeProfileUpdate {
                phone: Some("+100".into()),
                bank_details: Some(BankDetails {
                    pan: Some("PAN1".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Utc::now(),
        );

        assert_eq!(emp.name, "John Doe");
        assert_eq!(emp.department.as_deref(), Some("Ops"));
        assert_eq!(emp.phone.as_deref(), Some("+100"));
        assert_eq!(emp.bank_details.bank_name.as_deref(), Some("First Bank"));
        assert_eq!(emp.bank_details.pan.as_deref(), Some("PAN1"));
    }

    #[test]
    fn blank_name_is_ignored() {
        let mut emp = employee();
        emp.apply_update(
            EmployeeProfileUpdate {
                name: Some("   ".into()),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(emp.name, "John Doe");
    }
}
