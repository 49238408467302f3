fn main() {
    std::process::exit(ai_file_sorter::run());
}
