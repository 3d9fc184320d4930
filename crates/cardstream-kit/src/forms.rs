//! HTML fragments that move the shopper's browser to the gateway or the ACS.
//!
//! Rendered with `maud`, so every interpolated name and value is escaped.
//! Nested field maps are emitted as `outer[inner]` inputs.

use cardstream_core::{FieldValue, Fields};
use maud::{PreEscaped, html};
use url::Url;

pub const PAYMENT_FORM_ID: &str = "payment_network_payment_form";
pub const EMBEDDED_FRAME_NAME: &str = "paymentgatewayframe";
const EMBEDDED_FORM_ID: &str = "paymentgatewaymoduleform";
const SILENT_POST_ID: &str = "silentPost";

/// Escapes text for use in HTML content and quoted attributes.
pub fn escape_html(input: &str) -> String {
    html! { (input) }.into_string()
}

/// Field names and values, nested maps flattened to `outer[inner]`.
pub fn hidden_fields(fields: &Fields) -> Vec<(String, &str)> {
    let mut pairs = Vec::with_capacity(fields.len());
    push_pairs(&mut pairs, None, fields);
    pairs
}

fn push_pairs<'a>(pairs: &mut Vec<(String, &'a str)>, prefix: Option<&str>, fields: &'a Fields) {
    for (key, value) in fields {
        let name = match prefix {
            Some(prefix) => format!("{prefix}[{key}]"),
            None => key.clone(),
        };
        match value {
            FieldValue::Text(text) => pairs.push((name, text)),
            FieldValue::Map(map) => push_pairs(pairs, Some(&name), map),
        }
    }
}

/// An auto-submitting form posting the signed request to the hosted page.
pub fn hosted_redirect_form(action: &Url, fields: &Fields, gateway_name: &str) -> String {
    html! {
        form action=(action.as_str()) method="post" id=(PAYMENT_FORM_ID) {
            label { "Processing ..." }
            input type="submit" class="button alt" style="display: none;"
                value=(format!("Pay securely via {gateway_name}"));
            @for (name, value) in hidden_fields(fields) {
                input type="hidden" name=(name) value=(value);
            }
        }
        script type="text/javascript" {
            (PreEscaped(format!(
                "window.onload = function () {{ document.getElementById('{PAYMENT_FORM_ID}').submit(); }};"
            )))
        }
    }
    .into_string()
}

/// An iframe and a form that loads the hosted page into it.
pub fn embedded_form(action: &Url, fields: &Fields) -> String {
    html! {
        iframe id=(EMBEDDED_FRAME_NAME) name=(EMBEDDED_FRAME_NAME) frameBorder="0" seamless="seamless"
            style="width:699px; height:1100px;margin: 0 auto;display:block;" {}
        form id=(EMBEDDED_FORM_ID) action=(action.as_str()) method="post" target=(EMBEDDED_FRAME_NAME) {
            @for (name, value) in hidden_fields(fields) {
                input type="hidden" name=(name) value=(value);
            }
        }
        script {
            (PreEscaped(format!(
                r#"if (/Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini/i.test(navigator.userAgent)) {{
        const frame = document.querySelector('#{EMBEDDED_FRAME_NAME}');
        frame.style.height = '1280px';
        frame.style.width = '50%';
    }}
    document.getElementById('{EMBEDDED_FORM_ID}').submit();"#
            )))
        }
    }
    .into_string()
}

/// A form that posts `fields` to `action` as soon as it loads.
pub fn silent_post(action: &str, fields: &Fields, target: &str) -> String {
    html! {
        form id=(SILENT_POST_ID) action=(action) method="post" target=(target) {
            @for (name, value) in hidden_fields(fields) {
                input type="hidden" name=(name) value=(value);
            }
            noscript { input type="submit" value="Continue"; }
        }
        script {
            (PreEscaped(format!(
                "window.setTimeout(function () {{ document.getElementById('{SILENT_POST_ID}').submit(); }}, 0);"
            )))
        }
    }
    .into_string()
}

/// The 3-D Secure v1 hand-off to the issuer's ACS.
pub fn threeds_v1_form(acs_url: &str, md: &str, pareq: &str, term_url: &str) -> String {
    html! {
        p { "Your transaction requires 3D Secure Authentication" }
        form action=(acs_url) method="post" {
            input type="hidden" name="MD" value=(md);
            input type="hidden" name="PaReq" value=(pareq);
            input type="hidden" name="TermUrl" value=(term_url);
            input type="submit" value="Continue";
        }
    }
    .into_string()
}

/// Navigates the top window, breaking out of the embedded frame.
pub fn top_redirect_script(url: &str) -> String {
    let encoded = serde_json::to_string(url).unwrap_or_else(|_| "\"/\"".to_owned());
    html! {
        script {
            (PreEscaped(format!("window.top.location.href = {};", encoded.replace("</", "<\\/"))))
        }
    }
    .into_string()
}
