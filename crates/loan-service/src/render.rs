//! Server-rendered applicant form and result card.

use loan_core::{
    CreditHistory, Decision, DecisionLabel, Employment, ModelArchitecture, PropertyArea,
    RawApplicantForm, MAX_LOAN_TERM_YEARS, MIN_LOAN_TERM_YEARS,
};
use std::fmt::Write;

const STYLE_CSS: &str = include_str!("../assets/style.css");

/// What to show below the form.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Decided(Decision),
    Invalid(String),
}

/// Escape a string for safe interpolation into HTML text and attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn render_page(
    architecture: &ModelArchitecture,
    form: &RawApplicantForm,
    outcome: Option<&PageOutcome>,
) -> String {
    let mut body = String::new();
    body.push_str(
        "<h1 class='title'>Smart Loan Approval System &ndash; Stacking Model</h1>\n\
         <p class='subtitle'>Predict loan approval using a Stacking Ensemble Machine Learning model.</p>\n",
    );
    body.push_str(&render_form(form));
    body.push_str(&render_architecture(architecture));
    match outcome {
        Some(PageOutcome::Decided(decision)) => body.push_str(&render_result(decision)),
        Some(PageOutcome::Invalid(message)) => body.push_str(&render_error(message)),
        None => {}
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Smart Loan Approval System</title>\n<style>{}</style>\n</head>\n\
         <body>\n<main>\n{}</main>\n</body>\n</html>\n",
        STYLE_CSS, body
    )
}

fn render_form(form: &RawApplicantForm) -> String {
    let mut html = String::new();
    html.push_str("<section class='card'>\n<h2>Applicant Details</h2>\n");
    html.push_str("<form method='post' action='/'>\n<div class='columns'>\n<div>\n");
    html.push_str(&number_input(
        "applicant_income",
        "Applicant Income",
        &form.applicant_income,
        0,
        None,
        "any",
    ));
    html.push_str(&number_input(
        "coapplicant_income",
        "Co-Applicant Income",
        &form.coapplicant_income,
        0,
        None,
        "any",
    ));
    html.push_str(&number_input(
        "loan_amount",
        "Loan Amount",
        &form.loan_amount,
        0,
        None,
        "any",
    ));
    html.push_str(&number_input(
        "loan_term_years",
        "Loan Term (Years)",
        &form.loan_term_years,
        MIN_LOAN_TERM_YEARS,
        Some(MAX_LOAN_TERM_YEARS),
        "1",
    ));
    html.push_str("</div>\n<div>\n");
    html.push_str(&radio_group(
        "credit_history",
        "Credit History",
        &CreditHistory::ALL.map(CreditHistory::as_str),
        &form.credit_history,
    ));
    html.push_str(&select(
        "employment",
        "Employment Status",
        &Employment::ALL.map(Employment::as_str),
        &form.employment,
    ));
    html.push_str(&select(
        "property_area",
        "Property Area",
        &PropertyArea::ALL.map(PropertyArea::as_str),
        &form.property_area,
    ));
    html.push_str("</div>\n</div>\n");
    html.push_str(
        "<div class='center-btn'><button type='submit'>Check Loan Eligibility</button></div>\n",
    );
    html.push_str("</form>\n</section>\n");
    html
}

fn number_input(
    name: &str,
    label: &str,
    value: &str,
    min: u32,
    max: Option<u32>,
    step: &str,
) -> String {
    let max_attr = max.map(|max| format!(" max='{}'", max)).unwrap_or_default();
    format!(
        "<label for='{name}'>{label}</label>\n\
         <input type='number' id='{name}' name='{name}' value='{value}' min='{min}'{max_attr} step='{step}' required>\n",
        name = name,
        label = label,
        value = html_escape(value),
        min = min,
        max_attr = max_attr,
        step = step,
    )
}

fn radio_group(name: &str, label: &str, options: &[&str], selected: &str) -> String {
    let mut html = format!("<label>{}</label>\n<div class='radio-group'>\n", label);
    for option in options {
        let checked = if *option == selected { " checked" } else { "" };
        let _ = writeln!(
            html,
            "<label><input type='radio' name='{}' value='{}'{}> {}</label>",
            name, option, checked, option
        );
    }
    html.push_str("</div>\n");
    html
}

fn select(name: &str, label: &str, options: &[&str], selected: &str) -> String {
    let mut html = format!(
        "<label for='{name}'>{label}</label>\n<select id='{name}' name='{name}'>\n",
        name = name,
        label = label
    );
    for option in options {
        let attr = if *option == selected { " selected" } else { "" };
        let _ = writeln!(html, "<option value='{}'{}>{}</option>", option, attr, option);
    }
    html.push_str("</select>\n");
    html
}

fn render_architecture(architecture: &ModelArchitecture) -> String {
    let mut html = String::from(
        "<section class='card'>\n<h2>Model Architecture (Stacking)</h2>\n<ul>\n\
         <li><b>Base Models</b>\n<ul>\n",
    );
    for model in &architecture.base_models {
        let _ = writeln!(html, "<li>{}</li>", html_escape(model));
    }
    let _ = write!(
        html,
        "</ul>\n</li>\n<li><b>Meta Model</b>: {}</li>\n</ul>\n</section>\n",
        html_escape(&architecture.meta_model)
    );
    html
}

fn render_result(decision: &Decision) -> String {
    let (class, icon, recommendation) = match decision.label {
        DecisionLabel::Approved => ("approved", "&#9989;", "loan approval"),
        DecisionLabel::Rejected => ("rejected", "&#10060;", "loan rejection"),
    };
    let explanation = decision
        .label
        .explanation()
        .replace(recommendation, &format!("<b>{}</b>", recommendation));

    format!(
        "<section class='card' id='result'>\n<h2>Prediction Result</h2>\n\
         <div class='{class}'>{icon} {label}</div>\n\
         <p class='confidence'>Confidence Score: <b>{confidence}%</b></p>\n\
         <h3>Business Explanation</h3>\n<p class='explain'>{explanation}</p>\n</section>\n",
        class = class,
        icon = icon,
        label = decision.label.label(),
        confidence = decision.confidence_display(),
        explanation = explanation,
    )
}

fn render_error(message: &str) -> String {
    format!(
        "<section class='card' id='result'>\n<div class='error'>{}</div>\n</section>\n",
        html_escape(message)
    )
}
