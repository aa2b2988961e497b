use std::env;
use std::io::{stderr, stdout};
use sendgrid_mailer::run_mailer;

fn main() {
    let args: Vec<String> = env::args().collect();
    let envs: Vec<(String, String)> = env::vars().collect();

    let exit_code = run_mailer(&mut stdout(), &mut stderr(), &args, &envs);

    std::process::exit(exit_code);
}
