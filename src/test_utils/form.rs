use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|error| panic!("invalid selector {css:?}: {error}"))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&selector("form"))
        .next()
        .expect("want a form in the document, found none")
}

/// Assert that the form sends its request to `endpoint` via the htmx
/// `attribute`, e.g. "hx-post" or "hx-put".
#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    let got = form.value().attr(attribute);

    assert_eq!(
        got,
        Some(endpoint),
        "want form with {attribute}=\"{endpoint}\", got {got:?}"
    );
}

/// The required input named `name` with type `type_`.
#[track_caller]
fn must_get_required_input<'a>(form: &ElementRef<'a>, name: &str, type_: &str) -> ElementRef<'a> {
    let input = form
        .select(&selector(&format!("input[name={name}]")))
        .next()
        .unwrap_or_else(|| panic!("No input found with name \"{name}\" and type \"{type_}\""));

    let got_type = input.value().attr("type").unwrap_or_default();
    assert_eq!(
        got_type, type_,
        "want input {name} with type \"{type_}\", got {got_type:?}"
    );
    assert!(
        input.value().attr("required").is_some(),
        "want input {name} to be required"
    );

    input
}

#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    must_get_required_input(form, name, type_);
}

#[track_caller]
pub(crate) fn assert_form_input_with_value(
    form: &ElementRef<'_>,
    name: &str,
    type_: &str,
    value: &str,
) {
    let input = must_get_required_input(form, name, type_);
    let got_value = input.value().attr("value").unwrap_or_default();

    assert_eq!(
        got_value, value,
        "want input {name} with value \"{value}\", got {got_value:?}"
    );
}

#[track_caller]
fn must_get_submit_button<'a>(form: &ElementRef<'a>) -> ElementRef<'a> {
    let button = form
        .select(&selector("button"))
        .next()
        .expect("want a button in the form, found none");

    assert_eq!(
        button.value().attr("type"),
        Some("submit"),
        "want the first button to have type=\"submit\""
    );

    button
}

#[track_caller]
pub(crate) fn assert_form_submit_button(form: &ElementRef<'_>) {
    must_get_submit_button(form);
}

#[track_caller]
pub(crate) fn assert_form_submit_button_with_text(form: &ElementRef<'_>, text: &str) {
    let button = must_get_submit_button(form);

    assert_eq!(text_of(button), text);
}

/// Assert that the form shows the validation message `want_error_message`.
#[track_caller]
pub(crate) fn assert_form_error_message(form: &ElementRef<'_>, want_error_message: &str) {
    let message = form
        .select(&selector(r#"p[class*="text-red"]"#))
        .next()
        .map(text_of)
        .expect("want an error message in the form, found none");

    assert_eq!(message, want_error_message);
}

/// Assert the form has a select named `name` whose selected option has the
/// value `want_selected`, and return the values of every option.
#[track_caller]
pub(crate) fn assert_form_select(
    form: &ElementRef<'_>,
    name: &str,
    want_selected: Option<&str>,
) -> Vec<String> {
    let select = form
        .select(&selector(&format!("select[name={name}]")))
        .next()
        .unwrap_or_else(|| panic!("No select found with name \"{name}\""));

    let options = select.select(&selector("option")).collect::<Vec<_>>();
    let got_selected = options
        .iter()
        .find(|option| option.value().attr("selected").is_some())
        .and_then(|option| option.value().attr("value"));

    assert_eq!(
        got_selected, want_selected,
        "want select {name} to have {want_selected:?} selected, got {got_selected:?}"
    );

    options
        .iter()
        .map(|option| option.value().attr("value").unwrap_or_default().to_owned())
        .collect()
}
