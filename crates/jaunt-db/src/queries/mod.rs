mod commits;
mod moments;
mod trips;
mod users;
