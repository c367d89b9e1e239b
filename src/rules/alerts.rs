use super::{format_currency, format_percent};
use crate::anomaly::AnomalyReport;
use crate::cash_flow::CashFlowSummary;
use crate::error::MetricResult;
use crate::health::HealthScore;
use crate::profitability::ProfitabilitySummary;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CashFlow,
    FinancialHealth,
    Liquidity,
    Profitability,
    Anomalies,
    Investment,
    Expansion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    WithinWeek,
    WithinMonth,
    Consider,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub impact: Impact,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallRisk {
    VeryHigh,
    High,
    Medium,
    Low,
    Minimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub warning: usize,
    pub opportunity: usize,
    pub overall_risk: OverallRisk,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    pub critical_alerts: Vec<Alert>,
    pub warning_alerts: Vec<Alert>,
    pub opportunity_alerts: Vec<Alert>,
    pub severity_levels: SeveritySummary,
}

struct Context<'a> {
    cash_flow: Option<&'a CashFlowSummary>,
    profitability: Option<&'a ProfitabilitySummary>,
    anomalies: Option<&'a AnomalyReport>,
    health: &'a HealthScore,
}

struct AlertRule {
    when: fn(&Context) -> bool,
    build: fn(&Context) -> Alert,
}

const CRITICAL_RULES: &[AlertRule] = &[
    AlertRule {
        when: |ctx| {
            ctx.cash_flow
                .map(|cf| cf.net_cash_flow < -1000.0)
                .unwrap_or(false)
        },
        build: |ctx| {
            let net = ctx.cash_flow.map(|cf| cf.net_cash_flow).unwrap_or(0.0);
            Alert {
                kind: AlertKind::CashFlow,
                message: format!(
                    "Critical: Negative cash flow of {}",
                    format_currency(net.abs())
                ),
                impact: Impact::High,
                urgency: Urgency::Immediate,
            }
        },
    },
    AlertRule {
        when: |ctx| ctx.health.score < 40,
        build: |ctx| Alert {
            kind: AlertKind::FinancialHealth,
            message: format!(
                "Critical: Financial health score is {}/100",
                ctx.health.score
            ),
            impact: Impact::High,
            urgency: Urgency::Immediate,
        },
    },
];

const WARNING_RULES: &[AlertRule] = &[
    AlertRule {
        when: |ctx| {
            ctx.cash_flow
                .map(|cf| cf.cash_flow_ratio < 1.1)
                .unwrap_or(false)
        },
        build: |_| Alert {
            kind: AlertKind::Liquidity,
            message: "Warning: Low cash flow ratio indicates potential liquidity issues"
                .to_string(),
            impact: Impact::Medium,
            urgency: Urgency::WithinWeek,
        },
    },
    AlertRule {
        when: |ctx| {
            ctx.profitability
                .map(|p| p.gross_profit_margin < 0.1)
                .unwrap_or(false)
        },
        build: |ctx| {
            let margin = ctx
                .profitability
                .map(|p| p.gross_profit_margin)
                .unwrap_or(0.0);
            Alert {
                kind: AlertKind::Profitability,
                message: format!("Warning: Low profit margin of {}", format_percent(margin)),
                impact: Impact::Medium,
                urgency: Urgency::WithinMonth,
            }
        },
    },
    AlertRule {
        when: |ctx| ctx.anomalies.map(|a| a.anomaly_count > 0).unwrap_or(false),
        build: |ctx| {
            let (count, value) = ctx
                .anomalies
                .map(|a| (a.anomaly_count, a.total_anomaly_value))
                .unwrap_or((0, 0.0));
            Alert {
                kind: AlertKind::Anomalies,
                message: format!(
                    "Detected {} unusual transactions worth {}",
                    count,
                    format_currency(value)
                ),
                impact: Impact::Medium,
                urgency: Urgency::WithinWeek,
            }
        },
    },
];

const OPPORTUNITY_RULES: &[AlertRule] = &[
    AlertRule {
        when: |ctx| {
            ctx.cash_flow
                .map(|cf| cf.net_cash_flow > 10_000.0)
                .unwrap_or(false)
        },
        build: |ctx| {
            let net = ctx.cash_flow.map(|cf| cf.net_cash_flow).unwrap_or(0.0);
            Alert {
                kind: AlertKind::Investment,
                message: format!(
                    "Opportunity: Strong cash position of {} available for investment",
                    format_currency(net)
                ),
                impact: Impact::Positive,
                urgency: Urgency::Consider,
            }
        },
    },
    AlertRule {
        when: |ctx| {
            ctx.profitability
                .map(|p| p.gross_profit_margin > 0.3)
                .unwrap_or(false)
        },
        build: |ctx| {
            let margin = ctx
                .profitability
                .map(|p| p.gross_profit_margin)
                .unwrap_or(0.0);
            Alert {
                kind: AlertKind::Expansion,
                message: format!(
                    "Opportunity: Strong profit margin of {} suggests potential for growth",
                    format_percent(margin)
                ),
                impact: Impact::Positive,
                urgency: Urgency::Consider,
            }
        },
    },
];

fn run_rules(rules: &[AlertRule], context: &Context) -> Vec<Alert> {
    rules
        .iter()
        .filter(|rule| (rule.when)(context))
        .map(|rule| (rule.build)(context))
        .collect()
}

/// Overall risk derived from alert counts alone.
fn overall_risk(critical: usize, warning: usize) -> OverallRisk {
    if critical > 2 {
        OverallRisk::VeryHigh
    } else if critical > 0 {
        OverallRisk::High
    } else if warning > 3 {
        OverallRisk::Medium
    } else if warning > 0 {
        OverallRisk::Low
    } else {
        OverallRisk::Minimal
    }
}

/// Evaluates the three alert rule tables and summarizes their severity.
pub fn create_alerts(
    cash_flow: &MetricResult<CashFlowSummary>,
    profitability: &MetricResult<ProfitabilitySummary>,
    anomalies: &MetricResult<AnomalyReport>,
    health: &HealthScore,
) -> AlertReport {
    let context = Context {
        cash_flow: cash_flow.as_ref().ok(),
        profitability: profitability.as_ref().ok(),
        anomalies: anomalies.as_ref().ok(),
        health,
    };

    let critical_alerts = run_rules(CRITICAL_RULES, &context);
    let warning_alerts = run_rules(WARNING_RULES, &context);
    let opportunity_alerts = run_rules(OPPORTUNITY_RULES, &context);

    let severity_levels = SeveritySummary {
        critical: critical_alerts.len(),
        warning: warning_alerts.len(),
        opportunity: opportunity_alerts.len(),
        overall_risk: overall_risk(critical_alerts.len(), warning_alerts.len()),
    };

    AlertReport {
        critical_alerts,
        warning_alerts,
        opportunity_alerts,
        severity_levels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use std::collections::BTreeMap;

    fn cash_flow(net: f64, ratio: f64) -> CashFlowSummary {
        CashFlowSummary {
            net_cash_flow: net,
            total_income: 10_000.0,
            total_expenses: 10_000.0 - net,
            cash_flow_ratio: ratio,
            expense_ratio: 0.5,
            monthly_average: 0.0,
            seasonal_analysis: BTreeMap::new(),
        }
    }

    fn profitability(margin: f64) -> ProfitabilitySummary {
        ProfitabilitySummary {
            revenue: 10_000.0,
            costs: 10_000.0 * (1.0 - margin),
            gross_profit: 10_000.0 * margin,
            gross_profit_margin: margin,
            profit_per_transaction: 10.0,
            break_even: Err(AnalysisError::InsufficientSignal("break-even".into())),
            margin_trend_slope: 0.0,
        }
    }

    fn anomalies(count: usize, value: f64) -> AnomalyReport {
        AnomalyReport {
            anomaly_count: count,
            anomaly_percentage: count as f64,
            total_anomaly_value: value,
            anomalies: Vec::new(),
        }
    }

    fn health(score: u32) -> HealthScore {
        HealthScore {
            score,
            grade: "X",
            assessment: "test",
        }
    }

    #[test]
    fn test_critical_alerts() {
        let report = create_alerts(
            &Ok(cash_flow(-2_500.0, 0.7)),
            &Err(AnalysisError::MissingFinancialSignal),
            &Err(AnalysisError::InsufficientData {
                rows: 3,
                required: 10,
            }),
            &health(25),
        );

        assert_eq!(report.critical_alerts.len(), 2);
        assert_eq!(report.critical_alerts[0].kind, AlertKind::CashFlow);
        assert!(report.critical_alerts[0].message.contains("$2,500.00"));
        assert_eq!(report.critical_alerts[1].kind, AlertKind::FinancialHealth);
        assert_eq!(
            report.severity_levels.overall_risk,
            OverallRisk::High
        );
    }

    #[test]
    fn test_warning_alerts() {
        let report = create_alerts(
            &Ok(cash_flow(500.0, 1.05)),
            &Ok(profitability(0.05)),
            &Ok(anomalies(3, 15_000.0)),
            &health(60),
        );

        assert!(report.critical_alerts.is_empty());
        assert_eq!(report.warning_alerts.len(), 3);
        assert_eq!(report.warning_alerts[0].kind, AlertKind::Liquidity);
        assert_eq!(report.warning_alerts[1].kind, AlertKind::Profitability);
        assert!(report.warning_alerts[1].message.contains("5.0%"));
        assert_eq!(report.warning_alerts[2].kind, AlertKind::Anomalies);
        assert!(report.warning_alerts[2].message.contains("3 unusual"));
        assert_eq!(report.severity_levels.overall_risk, OverallRisk::Low);
    }

    #[test]
    fn test_opportunity_alerts() {
        let report = create_alerts(
            &Ok(cash_flow(15_000.0, 2.5)),
            &Ok(profitability(0.45)),
            &Err(AnalysisError::InsufficientData {
                rows: 5,
                required: 10,
            }),
            &health(95),
        );

        assert!(report.critical_alerts.is_empty());
        assert!(report.warning_alerts.is_empty());
        assert_eq!(report.opportunity_alerts.len(), 2);
        assert_eq!(report.opportunity_alerts[0].kind, AlertKind::Investment);
        assert_eq!(report.opportunity_alerts[1].kind, AlertKind::Expansion);
        assert_eq!(report.severity_levels.overall_risk, OverallRisk::Minimal);
    }

    #[test]
    fn test_overall_risk_ladder() {
        assert_eq!(overall_risk(3, 0), OverallRisk::VeryHigh);
        assert_eq!(overall_risk(2, 0), OverallRisk::High);
        assert_eq!(overall_risk(1, 5), OverallRisk::High);
        assert_eq!(overall_risk(0, 4), OverallRisk::Medium);
        assert_eq!(overall_risk(0, 3), OverallRisk::Low);
        assert_eq!(overall_risk(0, 1), OverallRisk::Low);
        assert_eq!(overall_risk(0, 0), OverallRisk::Minimal);
    }

    #[test]
    fn test_boundary_values_do_not_alert() {
        // Exactly -1000 net and exactly 0.1 margin sit outside the rules.
        let report = create_alerts(
            &Ok(cash_flow(-1_000.0, 1.1)),
            &Ok(profitability(0.1)),
            &Ok(anomalies(0, 0.0)),
            &health(40),
        );
        assert!(report.critical_alerts.is_empty());
        assert!(report.warning_alerts.is_empty());
        assert_eq!(report.severity_levels.overall_risk, OverallRisk::Minimal);
    }
}
