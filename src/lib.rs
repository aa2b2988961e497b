use std::io::Write;

pub mod args;
pub mod attachment;
pub mod backend;
pub mod logger;
pub mod markdown;
pub mod message;

use args::{MailerArgs, Options};
use attachment::AttachmentError;
use backend::{DeliveryResponse, EmailBackend};
use clap::Parser;
use log::{debug, error, info};
use message::Message;

/// Exit code for invalid command line input, matching clap's.
const USAGE_EXIT_CODE: i32 = 2;

/// Run one invocation. `envs` is the only environment consulted, logging included.
pub fn run_mailer(
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    args: &[String],
    envs: &[(String, String)],
) -> i32 {
    let args_str: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let cli_args = match MailerArgs::try_parse_from(args_str) {
        Ok(args) => args,
        Err(e) => {
            let out: &mut dyn Write = if e.use_stderr() { stderr } else { stdout };
            let _ = write!(out, "{}", e.render());
            return e.exit_code();
        }
    };

    logger::init_logger(cli_args.verbosity, envs);

    let options = match Options::from_args(cli_args) {
        Ok(options) => options,
        Err(e) => {
            error!("Invalid arguments: {}", e);
            let _ = writeln!(stderr, "send-email: {}", e);
            return USAGE_EXIT_CODE;
        }
    };
    debug!("Parsed options: {:?}", options);

    let backend = match backend::create_from_env(envs, &options.api_key) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Failed to set up delivery: {}", e);
            let _ = writeln!(stderr, "send-email: {}", e);
            return 1;
        }
    };

    deliver(&options, backend.as_ref(), stdout, stderr)
}

/// Assemble the message and hand it to `backend`, reporting the outcome.
///
/// Everything is built before the backend is called, so an error here never
/// results in a partial send.
pub fn deliver(
    options: &Options,
    backend: &dyn EmailBackend,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    let message = match build_message(options) {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to prepare attachments: {}", e);
            let _ = writeln!(stderr, "send-email: {}", e);
            return 1;
        }
    };

    match backend.send(&message) {
        Ok(response) => {
            let _ = print_response(stdout, &response);
            0
        }
        Err(e) => {
            error!("Failed to send email: {}", e);
            let _ = writeln!(stderr, "send-email: {}", e);
            1
        }
    }
}

/// Render the body and load attachments into a ready-to-send message.
pub fn build_message(options: &Options) -> Result<Message, AttachmentError> {
    let html = markdown::render_html(&options.markdown_body);
    let message = Message::new(&options.from, &options.to, &options.subject, html);

    if options.attachments.is_empty() {
        return Ok(message);
    }
    let attachments = attachment::reconcile(&options.attachments, &options.dispositions)?;
    info!("Attached {} file(s)", attachments.len());
    Ok(message.with_attachments(attachments))
}

fn print_response(out: &mut dyn Write, response: &DeliveryResponse) -> std::io::Result<()> {
    writeln!(out, "{}", response.status)?;
    writeln!(out, "{}", response.body)?;
    for (name, value) in &response.headers {
        writeln!(out, "{}: {}", name, value)?;
    }
    Ok(())
}
