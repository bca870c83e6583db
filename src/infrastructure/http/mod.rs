pub mod submitter;
