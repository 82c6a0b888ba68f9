//! JavaScript extraction programs and the selectors they rely on
//!
//! Each program is an expression evaluated in the page and returns plain JSON
//! values; normalization happens afterwards in `records::validator`.

/// One organic search result block
pub const SEARCH_RESULT_SELECTOR: &str = "div.g";

/// Result title inside a result block
pub const SEARCH_TITLE_SELECTOR: &str = "h3";

/// Result link inside a result block
pub const SEARCH_LINK_SELECTOR: &str = "a[href]";

/// One answer on a question page
pub const ANSWER_ITEM_SELECTOR: &str = "div[class*='dom_annotate_question_answer_item']";

/// Author name inside an answer
pub const ANSWER_AUTHOR_SELECTOR: &str = "span.q-text.qu-bold";

/// Answer body inside an answer
pub const ANSWER_BODY_SELECTOR: &str = "div.spacing_log_answer_content";

/// Button opening the answer sort menu
pub const SORT_MENU_SELECTOR: &str = "div.q-click-wrapper[aria-haspopup='true']";

/// Entries of the opened sort menu
pub const SORT_OPTION_SELECTOR: &str = "[role='menuitem'], div.puppeteer_test_popover_item";

/// Quote a value for embedding in a JS program
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Program returning `[{rank, title, url}]` for every organic result
#[must_use]
pub fn search_results_program() -> String {
    format!(
        r#"
    (() => {{
        const blocks = Array.from(document.querySelectorAll({blocks}));
        const results = [];
        for (const block of blocks) {{
            const title = block.querySelector({title});
            const link = block.querySelector({link});
            if (!title && !link) {{
                continue;
            }}
            results.push({{
                rank: results.length + 1,
                title: title ? title.innerText : null,
                url: link ? link.href : null
            }});
        }}
        return results;
    }})()
"#,
        blocks = js_string(SEARCH_RESULT_SELECTOR),
        title = js_string(SEARCH_TITLE_SELECTOR),
        link = js_string(SEARCH_LINK_SELECTOR),
    )
}

/// Program returning `[{author, body}]` for every loaded answer
#[must_use]
pub fn answers_program() -> String {
    format!(
        r#"
    (() => {{
        return Array.from(document.querySelectorAll({items})).map(item => {{
            const author = item.querySelector({author});
            const body = item.querySelector({body});
            return {{
                author: author ? author.innerText : null,
                body: body ? body.innerText : null
            }};
        }});
    }})()
"#,
        items = js_string(ANSWER_ITEM_SELECTOR),
        author = js_string(ANSWER_AUTHOR_SELECTOR),
        body = js_string(ANSWER_BODY_SELECTOR),
    )
}

/// Program clicking the sort menu entry labelled `label`; returns whether one was found
#[must_use]
pub fn select_sort_option_program(label: &str) -> String {
    format!(
        r#"
    (() => {{
        const wanted = {label}.trim().toLowerCase();
        const option = Array.from(document.querySelectorAll({options}))
            .find(el => el.innerText && el.innerText.trim().toLowerCase() === wanted);
        if (!option) {{
            return false;
        }}
        option.click();
        return true;
    }})()
"#,
        label = js_string(label),
        options = js_string(SORT_OPTION_SELECTOR),
    )
}
