mod auto_collapse;
mod discovery;
mod export;
mod helpers;
mod runtime_loop;
mod virtualization;
