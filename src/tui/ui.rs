use chrono::{DateTime, Utc};
use ratatui::prelude::*;
use ratatui::widgets::*;

use kioskflow::flow::{ResolvedMember, ScreenState};
use kioskflow::receipt::pretty_amount;

use super::app::App;
use super::theme::KioskTheme;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the current kiosk state
pub fn render(frame: &mut Frame, app: &App) {
    let theme = KioskTheme::default();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(1),    // Screen
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(frame, &theme, app, layout[0]);
    render_screen(frame, &theme, app, layout[1]);
    render_footer(frame, &theme, app, layout[2]);

    let controller = app.kiosk.controller();
    if let Some(prompt) = controller.prompt() {
        render_dialog(
            frame,
            &theme,
            &prompt.title,
            &prompt.body,
            "[Y]es / [N]o",
            theme.primary,
        );
    }
    if let Some(alert) = controller.alert() {
        render_dialog(
            frame,
            &theme,
            "Error",
            alert,
            "Press any key to dismiss",
            theme.error,
        );
    }
}

fn render_header(frame: &mut Frame, theme: &KioskTheme, app: &App, area: Rect) {
    let status = match app.kiosk.status() {
        Some(status) if status.deposit_in_progress => {
            Span::styled(" │ deposit open", Style::default().fg(theme.warning))
        }
        Some(status) if status.emptying_in_progress => {
            Span::styled(" │ emptying payout", Style::default().fg(theme.warning))
        }
        Some(status) => Span::styled(
            format!(" │ machine v{}", status.version),
            Style::default().fg(theme.success),
        ),
        None => Span::styled(" │ connecting...", theme.text_dim_style()),
    };

    let title_line = Line::from(vec![
        Span::styled("CASH TO CRYPTO", theme.primary_style().bold()),
        status,
    ]);

    let header = Paragraph::new(title_line).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.primary_style()),
    );

    frame.render_widget(header, area);
}

fn render_screen(frame: &mut Frame, theme: &KioskTheme, app: &App, area: Rect) {
    let controller = app.kiosk.controller();
    let spinner = SPINNER[app.spinner_frame % SPINNER.len()];
    let leg = controller
        .context()
        .and_then(|c| c.product.leg())
        .copied();

    let mut lines = vec![Line::from("")];
    match controller.screen() {
        ScreenState::Main => {
            lines.push(heading(theme, "CHOOSE A PRODUCT"));
            lines.push(Line::from(""));
            let status = app.kiosk.status();
            for (i, product) in controller.products().iter().enumerate() {
                let rate = product
                    .leg()
                    .zip(status.as_deref())
                    .and_then(|(leg, status)| {
                        leg.amount_field
                            .rate(status)
                            .map(|rate| format!("  ({} {} / CAD)", pretty_amount(rate, 6), leg.label))
                    })
                    .unwrap_or_default();
                lines.push(Line::from(vec![
                    Span::styled(format!("{}. ", i + 1), theme.primary_style().bold()),
                    Span::styled(product.to_string(), theme.text_primary_style()),
                    Span::styled(rate, theme.text_dim_style()),
                ]));
            }
        }
        ScreenState::AwaitFob => {
            lines.push(heading(theme, "PRESENT YOUR FOB"));
            lines.push(Line::from(""));
            lines.push(dim(theme, &"*".repeat(app.typed().chars().count())));
        }
        ScreenState::FobResolving => {
            lines.push(heading(theme, &format!("{} LOOKING UP MEMBER", spinner)));
        }
        ScreenState::FobResolved => match member(app) {
            Some((name, expiry)) => {
                lines.push(heading(theme, &format!("WELCOME {}", name.to_uppercase())));
                lines.push(Line::from(""));
                lines.push(text(theme, &format!("MEMBERSHIP EXPIRES {}", format_date(expiry))));
                lines.push(Line::from(""));
                lines.push(dim(theme, "Press Enter to pay for your membership"));
            }
            None => {
                lines.push(Line::from(Span::styled(
                    "FOB NOT REGISTERED",
                    Style::default().fg(theme.error).bold(),
                )));
                lines.push(Line::from(""));
                lines.push(dim(theme, "Ask a director to register your fob"));
            }
        },
        ScreenState::MembershipInsertBill => {
            lines.push(heading(theme, "FEED CAD BILLS INTO MACHINE"));
            lines.push(dim(theme, "NO REFUNDS. PRESS ENTER WHEN DONE."));
            lines.push(Line::from(""));
            lines.push(text(theme, &format!("INSERTED: ${} CAD", inserted(app))));
            if let Some((_, expiry)) = member(app) {
                lines.push(text(theme, &format!("CURRENT EXPIRY: {}", format_date(expiry))));
            }
            if let Some(preview) = app.kiosk.expiry_preview() {
                lines.push(Line::from(Span::styled(
                    format!("NEW EXPIRY: {}", format_date(preview)),
                    theme.highlight_style().bold(),
                )));
            }
        }
        ScreenState::MembershipFinalizing => {
            lines.push(heading(theme, &format!("{} EXTENDING MEMBERSHIP", spinner)));
        }
        ScreenState::MembershipDone => {
            lines.push(heading(theme, "MEMBERSHIP EXTENDED"));
            lines.push(Line::from(""));
            if let Some((name, expiry)) = member(app) {
                lines.push(text(theme, &format!("THANK YOU {}", name.to_uppercase())));
                lines.push(text(theme, &format!("NEW EXPIRY: {}", format_date(expiry))));
            }
        }
        ScreenState::ScanAddress => {
            let chain = leg.map(|l| l.chain).unwrap_or_default();
            lines.push(heading(theme, &format!("SCAN YOUR {} ADDRESS", chain.to_uppercase())));
            lines.push(Line::from(""));
            let scanning = if app.kiosk.is_scanning() { "scanner ready" } else { "" };
            lines.push(dim(theme, scanning));
            lines.push(dim(theme, app.typed()));
        }
        ScreenState::InsertBill => {
            lines.push(heading(theme, "FEED CAD BILLS INTO MACHINE"));
            lines.push(dim(theme, "NO REFUNDS. PRESS ENTER WHEN DONE."));
            lines.push(Line::from(""));
            if let Some(recipient) = controller.context().and_then(|c| c.recipient_address.as_deref()) {
                lines.push(dim(theme, &format!("TO: {}", recipient)));
            }
            lines.push(text(theme, &format!("INSERTED: ${} CAD", inserted(app))));
            if let Some(leg) = leg {
                let receivable = app
                    .kiosk
                    .receivable()
                    .map(|amount| pretty_amount(amount, 6))
                    .unwrap_or_else(|| "-".to_string());
                lines.push(Line::from(Span::styled(
                    format!("{} TO RECEIVE: {}", leg.label, receivable),
                    theme.highlight_style().bold(),
                )));
            }
        }
        ScreenState::SendingTx => {
            let label = leg.map(|l| l.label).unwrap_or_default();
            lines.push(heading(theme, &format!("{} SENDING {}", spinner, label)));
        }
        ScreenState::TxReceipt => {
            if let Some(receipt) = controller.receipt() {
                lines.push(heading(theme, &receipt.headline));
                lines.push(Line::from(""));
                lines.push(dim(theme, &format!("TX: {}", receipt.tx_hash)));
                for line in &receipt.lines {
                    lines.push(text(theme, line));
                }
                if let Some(qr) = receipt.explorer_qr() {
                    lines.push(Line::from(""));
                    lines.extend(qr.lines().map(|row| text(theme, row)));
                }
                if let Some(link) = &receipt.explorer_link {
                    lines.push(dim(theme, link));
                }
            }
        }
    }

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::NONE));
    frame.render_widget(widget, area);
}

fn render_footer(frame: &mut Frame, theme: &KioskTheme, app: &App, area: Rect) {
    let screen = app.kiosk.controller().screen();
    let help_text = match screen {
        ScreenState::Main => "1-9: Choose | E: Empty payout | R: Reset machine | Ctrl-C: Quit",
        ScreenState::AwaitFob => "Tap fob | Esc: Home",
        ScreenState::ScanAddress => "Scan QR code | Esc: Home",
        ScreenState::FobResolved => "Enter: Pay | Esc: Home",
        ScreenState::InsertBill | ScreenState::MembershipInsertBill => "Enter: Done | Esc: Home",
        s if s.is_awaiting_backend() => "Please wait | Esc: Home",
        _ => "Esc: Home",
    };

    let footer_line = Line::from(vec![
        Span::styled(format!(" {:?} ", screen), theme.primary_style().bold()),
        Span::styled(" │ ", theme.text_dim_style()),
        Span::styled(help_text, theme.text_dim_style()),
    ]);

    let footer = Paragraph::new(footer_line).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.primary_style()),
    );

    frame.render_widget(footer, area);
}

fn render_dialog(
    frame: &mut Frame,
    theme: &KioskTheme,
    title: &str,
    body: &str,
    hint: &str,
    border_color: Color,
) {
    let popup_area = centered_rect(60, 40, frame.area());
    frame.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(body, theme.text_primary_style())),
        Line::from(""),
        Line::from(Span::styled(hint, theme.text_dim_style())),
    ];

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(title, Style::default().fg(border_color).bold()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color)),
        );

    frame.render_widget(widget, popup_area);
}

fn heading<'a>(theme: &KioskTheme, content: &str) -> Line<'a> {
    Line::from(Span::styled(content.to_string(), theme.primary_style().bold()))
}

fn text<'a>(theme: &KioskTheme, content: &str) -> Line<'a> {
    Line::from(Span::styled(content.to_string(), theme.text_primary_style()))
}

fn dim<'a>(theme: &KioskTheme, content: &str) -> Line<'a> {
    Line::from(Span::styled(content.to_string(), theme.text_dim_style()))
}

fn member(app: &App) -> Option<(&str, DateTime<Utc>)> {
    match app.kiosk.controller().context()?.resolved_member.as_ref()? {
        ResolvedMember::Registered { name, expiry } => Some((name.as_str(), *expiry)),
        ResolvedMember::NotRegistered => None,
    }
}

fn inserted(app: &App) -> String {
    let amount = app
        .kiosk
        .status()
        .map(|s| s.current_deposit_amount)
        .unwrap_or(0.0);
    pretty_amount(amount, 2)
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Helper to create a centered rect of given percentage width/height
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
