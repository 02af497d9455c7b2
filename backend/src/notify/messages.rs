//! Bodies of the notifications sent around the submission workflow.

use crate::notify::OutgoingMail;
use chrono::{DateTime, Utc};

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn letter(to: &str, name: &str, subject: &str, body: String) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        recipient_name: name.to_string(),
        subject: subject.to_string(),
        body_html: format!("<p>Dear {},</p><br/>{}", escape(name), body),
    }
}

fn reviewer_note(comments: &str) -> String {
    if comments.trim().is_empty() {
        String::new()
    } else {
        format!(
            "<p><strong>Reviewer comments:</strong> {}</p><br/>",
            escape(comments.trim())
        )
    }
}

pub fn submission_received(to: &str, name: &str) -> OutgoingMail {
    letter(
        to,
        name,
        "Tax Return Submission Received",
        "<strong>Thank you for submitting your tax return!</strong><br/><br/>\
         <p>We have successfully received your tax return submission and our team is currently \
         reviewing it. We will notify you once the review process is complete.</p><br/>\
         <p>Here's what you can expect next:</p><br/>\
         <strong>Review Process:</strong> Our team will carefully review your submission to \
         ensure all details are accurate and complete.<br/>\
         <strong>Notification:</strong> You will receive an email notification once the review \
         is complete.<br/>\
         <strong>Further Steps:</strong> If additional information is required, we will reach \
         out to you directly.<br/><br/>"
            .to_string(),
    )
}

pub fn new_submission_alert(
    admin_email: &str,
    user_name: &str,
    user_email: &str,
    submitted_at: DateTime<Utc>,
) -> OutgoingMail {
    letter(
        admin_email,
        "Admin",
        "New Tax Return Submission Received",
        format!(
            "<strong>A new tax return submission has been received!</strong><br/><br/>\
             <strong>User Name:</strong> {}<br/>\
             <strong>User Email:</strong> {}<br/>\
             <strong>Submission Date:</strong> {}<br/><br/>\
             <p>Please review the submission at your earliest convenience.</p><br/>",
            escape(user_name),
            escape(user_email),
            submitted_at.format("%Y-%m-%d"),
        ),
    )
}

pub fn submission_approved(to: &str, name: &str, comments: &str) -> OutgoingMail {
    letter(
        to,
        name,
        "Tax Return Submission Approved",
        format!(
            "<strong>Great news! Your tax return submission has been approved.</strong><br/><br/>\
             <p>Your submission has been reviewed and approved. Your tax return is now \
             finalized and processed.</p><br/>{}\
             <p>You can download your documents from your account at any time.</p><br/>",
            reviewer_note(comments)
        ),
    )
}

pub fn submission_declined(to: &str, name: &str, comments: &str) -> OutgoingMail {
    letter(
        to,
        name,
        "Tax Return Submission Declined",
        format!(
            "<strong>We regret to inform you that your tax return submission has been \
             declined.</strong><br/><br/>{}\
             <p>Please review your submission, make the necessary corrections and resubmit \
             your tax return from your account.</p><br/>",
            reviewer_note(comments)
        ),
    )
}
