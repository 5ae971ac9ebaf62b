fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_index_page(result: Option<&str>, image_url: Option<&str>) -> String {
    let result_html = result
        .map(|text| format!(r#"<div class="result">{}</div>"#, escape_html(text)))
        .unwrap_or_default();
    let image_html = image_url
        .map(|url| {
            format!(
                r#"<img class="preview" src="{}" alt="Uploaded insulator">"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Insulator Monitor</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 720px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f8fafc;
        }}
        .container {{
            background-color: #ffffff;
            border-radius: 12px;
            padding: 32px;
            box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
        }}
        .result {{
            margin-top: 24px;
            font-size: 1.2em;
            font-weight: 600;
        }}
        .preview {{
            margin-top: 16px;
            max-width: 100%;
            border-radius: 8px;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Insulator Monitor</h1>
        <p>Upload a photo of an outdoor insulator to check whether it needs repair.</p>
        <form method="post" action="/" enctype="multipart/form-data">
            <input type="file" name="file" accept="image/*">
            <button type="submit">Check insulator</button>
        </form>
        {result_html}
        {image_html}
    </div>
</body>
</html>
"#
    )
}
