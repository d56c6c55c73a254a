//! Development dataset for the regulatory portal
//!
//! Populates the mock backend with records covering every screen of the
//! portal: companies with pending and approved permits, settled and failed
//! payments, expatriate personnel, a joint venture, local content plans,
//! scheduled inspections and a handful of notifications. Everything except
//! the notifications is created through the client, so the dataset doubles
//! as a smoke test of the client against the mock.

use crate::TestApp;
use anyhow::Result;
use jiff::{Span, Timestamp};
use payloads::{
    PaymentStatus, PlanStatus, Priority, Role, requests, responses,
};
use rust_decimal::dec;

pub struct DevDataset {
    pub operator: responses::Company,
    pub partner: responses::Company,
    pub pending_permit: responses::Permit,
    pub approved_permit: responses::Permit,
    pub rejected_permit: responses::Permit,
    pub paid_fee: responses::Payment,
    pub failed_fee: responses::Payment,
    pub joint_venture: responses::JointVenture,
    pub inspection: responses::Inspection,
    pub personnel: Vec<responses::Personnel>,
    pub plans: Vec<responses::LocalContentPlan>,
    pub notifications: Vec<responses::Notification>,
}

impl DevDataset {
    pub async fn create(app: &TestApp) -> Result<Self> {
        app.login_admin().await?;

        tracing::info!("🏢 Creating companies");
        let operator = app.create_test_company().await?;
        let partner = app
            .client
            .create_company(&crate::company_details_b())
            .await?;

        tracing::info!("📄 Creating permits in each review state");
        let pending_permit = app.create_test_permit(operator.id).await?;
        let approved_permit = app.create_test_permit(partner.id).await?;
        let approved_permit = app
            .client
            .approve_permit(&approved_permit.id, Some("All documents in order"))
            .await?;
        let rejected_permit = app
            .client
            .create_permit(&crate::permit_application_b(operator.id))
            .await?;
        let rejected_permit = app
            .client
            .reject_permit(
                &rejected_permit.id,
                Some("Environmental impact assessment missing"),
            )
            .await?;

        tracing::info!("💳 Creating payments");
        let paid_fee = app.create_test_payment(operator.id).await?;
        let paid_fee = app
            .client
            .update_payment_status(&paid_fee.id, PaymentStatus::Paid, None)
            .await?;
        let failed_fee = app
            .client
            .create_payment(&requests::PaymentDetails {
                company_id: partner.id,
                permit_id: Some(approved_permit.id),
                amount: dec!(4250.50),
                currency: "USD".into(),
                description: Some("Facility licence renewal".into()),
            })
            .await?;
        let failed_fee = app
            .client
            .update_payment_status(
                &failed_fee.id,
                PaymentStatus::Failed,
                Some("Card declined"),
            )
            .await?;

        tracing::info!("👷 Creating personnel, joint venture and plans");
        let mut personnel = Vec::new();
        for (name, nationality, position, expatriate) in [
            ("Ngozi Eze", "Nigerian", "Drilling engineer", false),
            ("Lars Henriksen", "Norwegian", "Subsea supervisor", true),
        ] {
            let details = requests::PersonnelDetails {
                name: name.into(),
                nationality: nationality.into(),
                position: position.into(),
                company_id: operator.id,
                passport_number: expatriate.then(|| "N0471123".to_string()),
                expatriate,
            };
            personnel.push(app.client.create_personnel(&details).await?);
        }

        let joint_venture = app
            .client
            .create_joint_venture(&requests::JointVentureDetails {
                name: "OML-42 Joint Venture".into(),
                operator_id: operator.id,
                partner_ids: vec![partner.id],
            })
            .await?;

        let mut plans = Vec::new();
        for (period, target, status) in [
            ("2025-Q1", dec!(45.0), PlanStatus::Approved),
            ("2025-Q2", dec!(50.0), PlanStatus::Submitted),
        ] {
            let details = requests::LocalContentPlanDetails {
                company_id: operator.id,
                period: period.into(),
                target_percentage: target,
                status: Some(status),
            };
            plans.push(app.client.create_local_content_plan(&details).await?);
        }

        let inspection = app
            .client
            .create_inspection(&requests::InspectionDetails {
                scheduled_for: Timestamp::now() + Span::new().hours(48),
                ..crate::inspection_details_a(operator.id)
            })
            .await?;

        tracing::info!("🔔 Seeding notifications");
        let notifications = vec![
            app.seed_notification(&crate::notification_details_a())?,
            app.seed_notification(&requests::NotificationDetails {
                title: "Payment failed".into(),
                message: "Facility licence renewal was declined".into(),
                priority: Priority::Critical,
            })?,
        ];

        Ok(Self {
            operator,
            partner,
            pending_permit,
            approved_permit,
            rejected_permit,
            paid_fee,
            failed_fee,
            joint_venture,
            inspection,
            personnel,
            plans,
            notifications,
        })
    }

    pub fn print_summary(&self) {
        tracing::info!("📋 Available test data:");
        tracing::info!(
            "   🏢 {} ({}): operator",
            self.operator.name,
            self.operator.id
        );
        tracing::info!(
            "   🏢 {} ({}): partner",
            self.partner.name,
            self.partner.id
        );
        tracing::info!("   📄 Permits:");
        for permit in [
            &self.pending_permit,
            &self.approved_permit,
            &self.rejected_permit,
        ] {
            tracing::info!(
                "      - {} {} ({:?})",
                permit.reference,
                permit.title,
                permit.status
            );
        }
        tracing::info!(
            "   💳 Payments: {} paid, {} failed",
            self.paid_fee.reference,
            self.failed_fee.reference
        );
        tracing::info!(
            "   🤝 {} with {} partner(s)",
            self.joint_venture.name,
            self.joint_venture.partner_ids.len()
        );
        tracing::info!(
            "   🔍 Inspection at {} on {}",
            self.inspection.facility,
            self.inspection.scheduled_for
        );
        tracing::info!(
            "   👷 {} personnel, {} local content plans, {} notifications",
            self.personnel.len(),
            self.plans.len(),
            self.notifications.len()
        );
        tracing::info!(
            "   🔑 Log in as {} ({})",
            crate::admin_credentials().email,
            Role::CommissionAdmin.label()
        );
    }
}
